pub mod assertion;
pub mod chain;
pub mod error;
pub mod extraction;
pub mod history;
pub mod http;
pub mod logger;
pub mod runner;
pub mod utils;
pub mod variable;

// Re-export commonly used types
pub use error::{ChainpostError, Result};
