// Public modules
pub mod bindings;
pub mod defaults;
pub mod download;
pub mod environment;
pub mod error;
pub mod logger;
pub mod provision;
pub mod stager;
pub mod supply;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
