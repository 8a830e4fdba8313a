//! Runtime configuration and platform paths.

mod paths;
mod types;

pub use paths::models_dir;
pub use types::ServerConfig;
