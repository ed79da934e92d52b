//! In-process keytab state and atomic replacement.

use std::collections::VecDeque;

use gmsa_types::{AuthError, KeytabEntry};
use parking_lot::RwLock;

use crate::format;

const MAX_BACKUPS: usize = 3;

/// A decoded keytab plus its original encoded form.
#[derive(Debug, Clone)]
pub struct Keytab {
    /// Decoded entries.
    pub entries: Vec<KeytabEntry>,
    /// The original base64-decoded blob, retained so `Replace` can keep a
    /// byte-for-byte backup without re-encoding.
    blob: Vec<u8>,
}

impl Keytab {
    /// Parse a keytab blob.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidKeytab`] if the blob does not parse.
    pub fn parse(blob: Vec<u8>) -> Result<Self, AuthError> {
        let entries = format::parse(&blob)?;
        Ok(Self { entries, blob })
    }

    /// Find the entry matching `principal@realm`, preferring the entry with
    /// the highest kvno if duplicates exist (a common side effect of
    /// back-to-back rotations without yet evicting the prior entry).
    #[must_use]
    pub fn find(&self, principal: &[String], realm: &str) -> Option<&KeytabEntry> {
        self.entries
            .iter()
            .filter(|e| e.principal == principal && e.realm == realm)
            .max_by_key(|e| e.kvno)
    }

    /// The raw encoded blob.
    #[must_use]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }
}

/// Holds the current service keytab and supports atomic, backed-up replacement.
///
/// Guarded by a single-writer/many-reader lock: readers (logins) acquire a
/// shared lock for the duration of one validation; writers (an operator
/// `Put`, or `RotationManager`) take the exclusive lock only for the swap.
pub struct KeytabStore {
    current: RwLock<Keytab>,
    backups: RwLock<VecDeque<Keytab>>,
    backup_keytabs: bool,
}

impl KeytabStore {
    /// Construct a store from an already-parsed keytab.
    pub fn new(initial: Keytab, backup_keytabs: bool) -> Self {
        Self {
            current: RwLock::new(initial),
            backups: RwLock::new(VecDeque::with_capacity(MAX_BACKUPS)),
            backup_keytabs,
        }
    }

    /// Construct a store by parsing `blob`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidKeytab`] if `blob` does not parse.
    pub fn from_blob(blob: Vec<u8>, backup_keytabs: bool) -> Result<Self, AuthError> {
        Ok(Self::new(Keytab::parse(blob)?, backup_keytabs))
    }

    /// Return a clone of the current keytab.
    ///
    /// # Errors
    ///
    /// This cannot currently fail (the lock is never poisoned on this
    /// platform target), but returns a `Result` so that a future storage-
    /// backed implementation can report a genuine load failure without
    /// changing the signature callers depend on.
    pub fn load(&self) -> Result<Keytab, AuthError> {
        Ok(self.current.read().clone())
    }

    /// Atomically replace the current keytab.
    ///
    /// On success, the previous keytab is pushed onto a bounded backup ring
    /// (capacity 3) when `backup_keytabs` is enabled, and any subsequent
    /// `load()` observes `new_blob`. On failure (parse error), the previous
    /// keytab remains canonical; no partial state is ever observable.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidKeytab`] if `new_blob` does not parse.
    pub fn replace(&self, new_blob: Vec<u8>, reason: &str) -> Result<(), AuthError> {
        let new_keytab = Keytab::parse(new_blob)?;

        let mut current = self.current.write();
        let previous = std::mem::replace(&mut *current, new_keytab);
        drop(current);

        if self.backup_keytabs {
            let mut backups = self.backups.write();
            if backups.len() == MAX_BACKUPS {
                backups.pop_front();
            }
            backups.push_back(previous);
        }

        tracing::info!(reason, "keytab replaced");
        Ok(())
    }

    /// Number of backup keytabs currently retained.
    #[must_use]
    pub fn backup_count(&self) -> usize {
        self.backups.read().len()
    }
}
