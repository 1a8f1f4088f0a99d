//! Authorization registry.
//!
//! The registry maps ticket identities to activated authorizations. It is
//! shared by every request handler: ticket management requests add and
//! remove entries while image requests check them. All access goes through
//! a single mutex, held only for the map operation itself and never across
//! I/O.
//!
//! Expiry is evaluated lazily on every check; expired entries stay in the
//! map until revoked.
//!
//! Revoking a ticket does not cancel a transfer that was already authorized
//! under it. The capability is checked once, when the transfer starts.

use crate::authorization::Authorization;
use crate::error::{AuthError, Result};
use crate::ticket::{Operation, Ticket};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// Concurrent store of authorizations keyed by ticket uuid
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<String, Arc<Authorization>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section is a single map operation, so a panic while
    // holding the lock cannot leave the map half-updated.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<Authorization>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Activate `ticket`, replacing any authorization with the same uuid
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket url is invalid or uses an unsupported
    /// scheme. Nothing is stored in that case.
    pub fn activate(&self, ticket: Ticket) -> Result<()> {
        let mut entries = self.entries();
        let uuid = ticket.uuid().to_string();
        let auth = Authorization::new(ticket)?;
        tracing::debug!(
            "Activated ticket {} (mode={}, size={}, timeout={}s)",
            uuid,
            auth.ticket().mode(),
            auth.ticket().size(),
            auth.ticket().timeout().as_secs()
        );
        entries.insert(uuid, Arc::new(auth));
        Ok(())
    }

    /// Remove the authorization for `uuid`
    ///
    /// Removing an unknown uuid is not an error.
    pub fn revoke(&self, uuid: &str) {
        if self.entries().remove(uuid).is_some() {
            tracing::debug!("Revoked ticket {}", uuid);
        }
    }

    /// Get the authorization for `uuid` without checking it
    pub fn lookup(&self, uuid: &str) -> Result<Arc<Authorization>> {
        self.entries()
            .get(uuid)
            .cloned()
            .ok_or_else(|| AuthError::NotFound(uuid.to_string()))
    }

    /// Check if the holder of `uuid` may read up to `size` bytes
    ///
    /// Returns the url to read from.
    pub fn check_read(&self, uuid: &str, size: u64) -> Result<Url> {
        self.check(uuid, Operation::Read, size)
    }

    /// Check if the holder of `uuid` may write up to `size` bytes
    ///
    /// Returns the url to write to.
    pub fn check_write(&self, uuid: &str, size: u64) -> Result<Url> {
        self.check(uuid, Operation::Write, size)
    }

    /// Look up `uuid` and check `op` under the same lock, so a concurrent
    /// revoke cannot slip in between.
    pub fn check(&self, uuid: &str, op: Operation, size: u64) -> Result<Url> {
        let entries = self.entries();
        let auth = entries
            .get(uuid)
            .ok_or_else(|| AuthError::NotFound(uuid.to_string()))?;
        auth.check(op, size).inspect_err(|err| {
            tracing::debug!("Denied {:?} of {} bytes for {}: {}", op, size, uuid, err);
        })
    }

    /// Number of registered authorizations, including expired ones
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
