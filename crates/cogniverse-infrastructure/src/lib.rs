pub mod paths;
pub mod storage;

pub use crate::paths::CogniversePaths;
pub use crate::storage::{ConfigStorage, FileStore, SecretStorage};
