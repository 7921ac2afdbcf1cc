//! Use-case orchestration: load, mutate through the model, persist.
//!
//! # Invariants
//! - Services never bypass model relation checks or repository validation.
//! - Every mutating use case logs one outcome line (`ok` at info,
//!   `rejected` at warn) carrying ids only.
//! - Load and write are separate repository calls; concurrent writers to
//!   the same row are last-write-wins.

pub mod error;
pub mod event_service;
pub mod event_type_service;

use crate::service::error::ServiceError;
use log::warn;

fn log_rejected(event: &str, entity_id: i64, err: &ServiceError) {
    warn!(
        "event={event} module=service status=rejected id={entity_id} error_code={}",
        err.code()
    );
}

/// Logs a rejected outcome and passes the result through.
pub(crate) fn logged<T>(
    event: &str,
    entity_id: i64,
    result: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    if let Err(err) = &result {
        log_rejected(event, entity_id, err);
    }
    result
}
