pub mod config;
pub mod resolver;
pub mod types;

pub use config::{ChainpostConfig, ConfigLoader};
pub use resolver::VariableResolver;
pub use types::{Environment, EnvironmentVariable, SECRET_MASK, VariableScope, mask_secrets};
