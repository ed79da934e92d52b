//! `ConfigStore`: normalize-then-validate-then-swap for the singleton
//! per-mount `Config`.

use gmsa_keytab::Keytab;
use gmsa_types::{AuthError, Config};
use parking_lot::RwLock;

/// Holds the current `Config`, if one has been set.
///
/// `put` never mutates the stored config in place: it validates a
/// complete replacement candidate and only then swaps it in, so a failed
/// `put` leaves the prior config (including its keytab) untouched and
/// fully functional.
#[derive(Default)]
pub struct ConfigStore {
    current: RwLock<Option<Config>>,
}

impl ConfigStore {
    /// An empty store with no config set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and validate `cfg`, including that its keytab parses and
    /// contains an entry for `spn@realm`, then store it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] on a shape violation, or
    /// [`AuthError::InvalidKeytab`] if the keytab does not parse or has no
    /// matching entry. The prior config is left untouched in either case.
    pub fn put(&self, mut cfg: Config) -> Result<(), AuthError> {
        cfg.normalize();
        cfg.validate_shape()?;

        let keytab = Keytab::parse(cfg.keytab.expose().to_vec())?;
        let (service, host) = cfg.spn.split_once('/').ok_or_else(|| {
            AuthError::ConfigInvalid(format!("spn must be of the form SERVICE/host[:port], got {:?}", cfg.spn))
        })?;
        if keytab.find(&[service.to_string(), host.to_string()], &cfg.realm).is_none() {
            return Err(AuthError::InvalidKeytab);
        }

        *self.current.write() = Some(cfg);
        tracing::info!("config replaced");
        Ok(())
    }

    /// Fetch the current config, if any has been set.
    #[must_use]
    pub fn get(&self) -> Option<Config> {
        self.current.read().clone()
    }

    /// Clear the current config.
    pub fn delete(&self) {
        *self.current.write() = None;
    }
}
