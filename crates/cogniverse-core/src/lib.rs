pub mod attachment;
pub mod cache;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod session;
pub mod settings;
pub mod storage;

// Re-export common error type
pub use error::{CogniverseError, Result};
