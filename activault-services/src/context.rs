//! The service context: store plus artifact issuer, built once at
//! startup from [`ServerConfig`].

use activault_artifact::ArtifactIssuer;
use activault_authz::{authorize, AccessLevel, Grant};
use activault_crypto::{ArtifactKey, SigningKey};
use activault_store::{managers, Store};
use activault_types::Actor;
use rusqlite::Connection;

use crate::config::{ConfigError, ServerConfig};
use crate::error::ServiceResult;

/// All mutation and query services, sharing one store and one issuer.
///
/// Operation methods live in impl blocks next to their domain modules.
pub struct Services {
    pub(crate) store: Store,
    pub(crate) issuer: ArtifactIssuer,
}

impl Services {
    pub fn new(store: Store, issuer: ArtifactIssuer) -> Self {
        Self { store, issuer }
    }

    /// Builds the context from configuration. Fails fast on a missing
    /// database, an unloadable signing key or a malformed artifact key.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let store = Store::open(&config.database_path)?;
        let signing_key = SigningKey::from_pem_file(&config.signing_key_path)?;
        let artifact_key = ArtifactKey::from_base64(&config.artifact_key_base64)?;
        tracing::info!(
            database = %config.database_path.display(),
            "service context initialized"
        );
        Ok(Self::new(store, ArtifactIssuer::new(signing_key, artifact_key)))
    }

    /// The underlying store, exposed for read paths and tests.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// Looks up the actor's manager record for the product and runs the
/// authorization matrix at the required level.
pub(crate) fn require_access(
    conn: &Connection,
    actor: &Actor,
    product_id: i64,
    level: AccessLevel,
) -> ServiceResult<Grant> {
    let manager = if actor.is_super_admin() {
        None
    } else {
        managers::get(conn, product_id, actor.user_id)?
    };
    Ok(authorize(actor, manager.as_ref(), level)?)
}
