//! Activation artifact pipeline.
//!
//! Turns a stored device into the encrypted, signed file its hardware
//! activates from. Issuance is deliberately read-only and unauthorized:
//! any caller who can name a serial number may fetch its artifact, since
//! the artifact only restates entitlement state the store already holds.

mod error;
mod pipeline;
mod snapshot;

pub use error::{ArtifactError, ArtifactResult};
pub use pipeline::{
    open_artifact, suggested_filename, ArtifactIssuer, IssuedArtifact, ARTIFACT_EXTENSION,
};
pub use snapshot::{ActivationData, ActivationFile};
