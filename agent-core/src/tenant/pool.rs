use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rst_common::with_logging::log::{debug, warn};

use super::tenant::Tenant;
use super::types::{TenantError, TenantID};

/// HandlePool counts open handles per tenant. The secure context is shared by every
/// handle of a tenant, it is considered closed again once its count drops to zero
#[derive(Clone, Default)]
pub struct HandlePool {
    counts: Arc<Mutex<HashMap<TenantID, usize>>>,
}

impl HandlePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, tenant: Tenant) -> Result<TenantHandle, TenantError> {
        let mut counts = self
            .counts
            .lock()
            .map_err(|err| TenantError::HandleError(err.to_string()))?;

        let count = counts.entry(tenant.id().clone()).or_insert(0);
        if *count == 0 {
            debug!("opening tenant context: {}", tenant.id());
        }
        *count += 1;

        Ok(TenantHandle {
            tenant,
            pool: self.clone(),
        })
    }

    pub fn open_handles(&self, id: &TenantID) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.get(id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn release(&self, id: &TenantID) {
        let Ok(mut counts) = self.counts.lock() else {
            warn!("tenant handle pool poisoned, cannot release: {}", id);
            return;
        };

        if let Some(count) = counts.get_mut(id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(id);
                debug!("closing tenant context: {}", id);
            }
        }
    }
}

/// TenantHandle is a scoped claim on a tenant's secure context, released when dropped
pub struct TenantHandle {
    tenant: Tenant,
    pool: HandlePool,
}

impl TenantHandle {
    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }
}

impl Drop for TenantHandle {
    fn drop(&mut self) {
        self.pool.release(self.tenant.id());
    }
}
