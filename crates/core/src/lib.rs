pub mod config;
pub mod error;

pub use config::{Config, DevtoolsConfig, ResearchConfig};
pub use error::{Error, Result};
