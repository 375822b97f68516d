//! On-demand status reads that never fail past this boundary.

use std::sync::Arc;

use log::debug;

use crate::control::ServiceControl;
use crate::status::ServiceSnapshot;

/// Stateless reader for one named service.
///
/// Cheap enough to call at sub-second cadence, and safe to call while
/// a lifecycle operation is in flight: it shares the backend but none
/// of the controller's state.
#[derive(Clone)]
pub struct ServiceProbe {
    service_name: String,
    control: Arc<dyn ServiceControl>,
}

impl ServiceProbe {
    pub fn new(service_name: &str, control: Arc<dyn ServiceControl>) -> Self {
        Self {
            service_name: service_name.to_string(),
            control,
        }
    }

    /// Read the current state. Every backend failure, including a
    /// missing service or an access-denied open, is folded into the
    /// snapshot instead of propagating.
    pub fn snapshot(&self) -> ServiceSnapshot {
        match self.control.query_status() {
            Ok(status) => ServiceSnapshot::present(status),
            Err(err) => {
                debug!("probe of '{}' failed: {err}", self.service_name);
                ServiceSnapshot::missing(err.to_string())
            }
        }
    }
}
