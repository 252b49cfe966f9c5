pub mod chain;
pub mod config;
pub mod error;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod schema;
pub mod types;
pub mod wallet;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chain::ChainWallet;
pub use config::{ConfigError, RuntimeConfig};
pub use error::{format_failure, ActionError, ErrorKind};
pub use provider::{ActionMetadata, ActionProvider};
pub use registry::{ActionOutcome, ProviderRegistry, RegisteredAction};
pub use schema::{ActionSchema, FieldSpec, FieldViolation, ValidatedInput, ValidationError};
pub use types::*;
pub use wallet::{ContractRead, WalletError, WalletPort};
