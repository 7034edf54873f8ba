pub mod assemble;
pub mod backend;
pub mod classify;
pub mod cli;
pub mod collect;
pub mod config;
pub mod fetch;
pub mod harvest;
pub mod run;
pub mod scroll;
pub mod session;

pub use folio_common::error;
pub use folio_common::protocol;
