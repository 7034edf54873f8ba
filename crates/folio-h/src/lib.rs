pub mod backend;
pub mod cdp;
mod inject;

pub use backend::HeadlessRenderer;
pub use cdp::LaunchOptions;
