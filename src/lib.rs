pub mod config;
pub mod error;
pub mod kernel;
pub mod memory;
pub mod outputs;
pub mod policy;

// Re-export specific items for convenient access
pub use config::NeonConfig;
pub use error::{AgentError, StorageError};
pub use kernel::reactor::Reactor;
