pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod fullname;
pub mod source;
pub mod store;
pub mod sync;
pub mod transcript;

pub use config::Config;
pub use error::{Error, Result};
pub use store::MetadataStore;
