//! Prerequisite checks run before any catalog resource is touched.

use aiext_api::logging;
use tracing::debug;

use crate::api::SchemaRegistry;
use crate::error::{Error, Result};

/// Verify every CRD in `names` is installed, in order.
///
/// The first missing one is reported as [`Error::DependencyNotReady`]; query
/// failures are returned unchanged.
#[tracing::instrument(skip_all, fields(component = logging::PREFLIGHT))]
pub async fn check_crds(schemas: &dyn SchemaRegistry, names: &[String]) -> Result<()> {
    for name in names {
        if !schemas.crd_exists(name).await? {
            debug!(dependency = %name, "Required CRD not found yet");
            return Err(Error::DependencyNotReady {
                dependency: name.clone(),
            });
        }
    }
    debug!("All required CRDs are present");
    Ok(())
}
