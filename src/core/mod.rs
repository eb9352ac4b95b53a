// Public modules
pub mod config;
pub mod defaults;
pub mod environment;
pub mod error;
pub mod executor;
pub mod matrix;
pub mod pipeline;
pub mod secrets;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
