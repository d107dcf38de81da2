pub mod client;
pub mod executor;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types for convenient access
pub use client::Client;
pub use executor::{RequestExecutor, TransportError};
pub use request::ResolvedRequest;
pub use response::ResponseRecord;
pub use types::{Method, Status};
