//! Mutation and query services over the entitlement store.
//!
//! Every mutation follows the same template: authorize the actor against
//! the product's management team, validate input, then run the mutation
//! and its audit ledger entry inside one transaction. A failed ledger
//! write rolls the mutation back, so nothing commits unaudited.
//!
//! Construction happens once at startup: [`ServerConfig`] names the
//! database, the RSA signing key PEM and the base64 artifact key, and
//! [`Services::from_config`] fails fast if any of them is unusable.

mod audit;
mod config;
mod context;
mod device;
mod error;
mod feature;
mod license_type;
mod product;
mod version;

pub use config::{ConfigError, ServerConfig};
pub use context::Services;
pub use error::{ServiceError, ServiceResult};
pub use license_type::LicenseTypeDetail;
pub use product::{AssistantUpdate, ProductChanges};

pub use activault_audit::AuditFilter;
pub use activault_store::devices::{DeviceFilter, NewDevice};
