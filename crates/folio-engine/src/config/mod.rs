pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{BrowserConfig, FetchConfig, FolioConfig, OutputConfig, ScrollConfig};
