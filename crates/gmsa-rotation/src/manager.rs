//! Background rotation state machine.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gmsa_keytab::KeytabStore;
use gmsa_types::{AuthError, RotationConfig, RotationState, RotationStatus};
use parking_lot::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::directory::{DirectoryClient, KeytabGenerator};
use crate::webhook::{self, RotationWebhookPayload};

/// Drives the {idle, checking, rotating, error} state machine for one
/// mount's keytab on its own background task.
///
/// Holds only what it needs to run a cycle: the keytab it writes into, and
/// the two pluggable collaborators (`DirectoryClient`, `KeytabGenerator`)
/// that reach the actual domain controller. Never touches `ConfigStore` or
/// `RoleStore` directly; those are host-side concerns.
pub struct RotationManager<D, G> {
    config: RwLock<RotationConfig>,
    status: RwLock<RotationStatus>,
    keytab_store: Arc<KeytabStore>,
    directory: D,
    generator: G,
    http: reqwest::Client,
}

impl<D, G> RotationManager<D, G>
where
    D: DirectoryClient,
    G: KeytabGenerator,
{
    /// Construct a manager. Does not start the background worker; call
    /// [`RotationManager::spawn`] for that.
    pub fn new(config: RotationConfig, keytab_store: Arc<KeytabStore>, directory: D, generator: G) -> Self {
        Self {
            config: RwLock::new(config),
            status: RwLock::new(RotationStatus::default()),
            keytab_store,
            directory,
            generator,
            http: reqwest::Client::new(),
        }
    }

    /// Current observable status, for `rotation/status`.
    #[must_use]
    pub fn status(&self) -> RotationStatus {
        self.status.read().clone()
    }

    /// Replace the rotation policy in effect. Takes effect on the next
    /// check; does not interrupt a cycle already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] if `config`'s shape is invalid.
    pub fn update_config(&self, config: RotationConfig) -> Result<(), AuthError> {
        config.validate_shape()?;
        *self.config.write() = config;
        Ok(())
    }

    /// The rotation policy currently in effect.
    #[must_use]
    pub fn config(&self) -> RotationConfig {
        self.config.read().clone()
    }

    fn check_interval(&self) -> Duration {
        Duration::from_secs(self.config.read().check_interval_sec)
    }

    /// Run one idle -> checking -> (rotating | idle) cycle immediately,
    /// independent of `check_interval_sec`. Used by `rotation/rotate`.
    pub async fn force_check(&self, cancel: &CancellationToken) {
        self.run_one_cycle(cancel).await;
    }

    /// Run the background loop until `cancel` fires. Intended to be driven
    /// by `tokio::spawn(manager.run(cancel))`; returns once the current
    /// cycle (if any) finishes and the token is observed.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        {
            let mut status = self.status.write();
            status.is_running = true;
        }

        let mut ticker = tokio::time::interval(self.check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.config.read().enabled {
                        continue;
                    }
                    self.run_one_cycle(&cancel).await;
                    let new_interval = self.check_interval();
                    if new_interval != ticker.period() {
                        ticker = tokio::time::interval(new_interval);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    }
                }
            }
        }

        self.status.write().is_running = false;
    }

    /// One idle -> checking -> (rotating | idle) transition, with retry.
    async fn run_one_cycle(&self, cancel: &CancellationToken) {
        self.status.write().state = RotationState::Checking;
        self.status.write().last_check = Some(Utc::now());

        let (directory_address, admin_username, admin_password, max_retries, retry_delay) = {
            let cfg = self.config.read();
            (
                cfg.directory_address.clone(),
                cfg.admin_username.clone(),
                cfg.admin_password.clone(),
                cfg.max_retries,
                Duration::from_secs(cfg.retry_delay_sec),
            )
        };

        let metadata = match self.directory.password_metadata(&directory_address, &admin_username, &admin_password).await {
            Ok(m) => m,
            Err(e) => {
                self.enter_error(&e, 0);
                return;
            }
        };

        {
            let mut status = self.status.write();
            status.password_age_days = Some(metadata.age_days);
            status.password_expiry = metadata.expiry;
        }

        let threshold_sec = self.config.read().rotation_threshold_sec;
        let age_trigger = u64::from(metadata.age_days) * 86_400 >= threshold_sec;
        let expiry_trigger = metadata
            .expiry
            .is_some_and(|expiry| (expiry - Utc::now()).num_seconds() <= threshold_sec as i64);

        if !age_trigger && !expiry_trigger {
            self.status.write().state = RotationState::Idle;
            return;
        }

        self.status.write().state = RotationState::Rotating;

        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.rotate_once(&directory_address, &admin_username, &admin_password).await {
                Ok(()) => {
                    let mut status = self.status.write();
                    status.state = RotationState::Idle;
                    status.last_rotation = Some(Utc::now());
                    status.rotation_count += 1;
                    status.last_error = None;
                    status.next_rotation = Some(Utc::now() + chrono::Duration::seconds(self.config.read().check_interval_sec as i64));
                    drop(status);
                    self.send_webhook("rotation succeeded").await;
                    break;
                }
                Err(e) => {
                    attempt += 1;
                    self.enter_error(&e, attempt);
                    if attempt > max_retries {
                        self.status.write().state = RotationState::Idle;
                        self.send_webhook("rotation failed, giving up for this cycle").await;
                        break;
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(retry_delay) => {}
                    }
                }
            }
        }
    }

    /// Query, generate, validate, and swap in a new keytab. Returns without
    /// mutating `keytab_store` on any failure.
    async fn rotate_once(&self, directory_address: &str, admin_username: &str, admin_password: &gmsa_types::SecretString) -> Result<(), AuthError> {
        let new_blob = self.generator.generate(directory_address, admin_username, admin_password).await?;

        // Validate before committing: a structural parse is the floor every
        // generator output must clear. A full self-test SPNEGO exchange
        // against a locally issued ticket would additionally exercise the
        // decryption path, but requires a KDC-facing ticket source this
        // manager does not have; structural parse is the supported fallback
        // named for exactly this case.
        gmsa_keytab::Keytab::parse(new_blob.clone())?;

        self.keytab_store.replace(new_blob, "scheduled rotation")?;
        Ok(())
    }

    fn enter_error(&self, e: &AuthError, attempt: u32) {
        let mut status = self.status.write();
        status.state = RotationState::Error;
        status.last_error = Some(e.code().to_string());
        drop(status);
        tracing::warn!(error_code = e.code(), attempt, "rotation cycle failed");
    }

    async fn send_webhook(&self, message: &str) {
        let endpoint = { self.config.read().notification_endpoint.clone() };
        let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) else {
            return;
        };
        let status = self.status.read().clone();
        let payload = RotationWebhookPayload {
            timestamp: Utc::now(),
            message: message.to_string(),
            status: status.state,
            rotation_count: status.rotation_count,
            password_age: status.password_age_days,
            password_expiry: status.password_expiry,
        };
        webhook::notify(&self.http, &endpoint, &payload).await;
    }
}
