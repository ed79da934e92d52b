//! `GmsaMount`: all state for one operator mount, explicit and
//! non-global — the host may construct many of these in one process.

use std::sync::Arc;
use std::time::Instant;

use gmsa_authz::GroupPolicyMap;
use gmsa_keytab::KeytabStore;
use gmsa_metrics::{Counters, Snapshot};
use gmsa_rotation::{DirectoryClient, KeytabGenerator, RotationManager};
use gmsa_store::{ConfigStore, InMemoryRoleBackend, RoleStore};
use gmsa_types::{AuthError, AuthIssue, Config, Role, RotationConfig, RotationStatus};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::dto::{ConfigReadResponse, ConfigWriteRequest, HealthRequest, HealthResponse, LoginWriteRequest, RoleListResponse, RoleWriteRequest, SystemInfo};

type Rotation = RotationManager<Box<dyn DirectoryClient>, Box<dyn KeytabGenerator>>;

struct RunningWorker {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// One operator mount: its config, keytab, roles, counters, and rotation
/// worker. Handlers take `&GmsaMount` explicitly rather than reaching for
/// any process-global state, so one plugin process can serve many mounts
/// concurrently without cross-mount interference.
pub struct GmsaMount {
    config_store: ConfigStore,
    keytab_store: Mutex<Option<Arc<KeytabStore>>>,
    role_store: RoleStore<InMemoryRoleBackend>,
    counters: Counters,
    group_policies: Mutex<GroupPolicyMap>,
    rotation: Mutex<Option<Arc<Rotation>>>,
    rotation_worker: Mutex<Option<RunningWorker>>,
    started_at: Instant,
}

impl Default for GmsaMount {
    fn default() -> Self {
        Self::new()
    }
}

impl GmsaMount {
    /// A fresh mount with no config, no roles, and rotation disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_store: ConfigStore::new(),
            keytab_store: Mutex::new(None),
            role_store: RoleStore::new(InMemoryRoleBackend::default()),
            counters: Counters::new(),
            group_policies: Mutex::new(GroupPolicyMap::new()),
            rotation: Mutex::new(None),
            rotation_worker: Mutex::new(None),
            started_at: Instant::now(),
        }
    }

    /// Write (create or replace) the mount's config. On success, also
    /// rebuilds the in-process keytab cache the rotation worker and
    /// validator read from.
    ///
    /// # Errors
    ///
    /// See [`gmsa_store::ConfigStore::put`].
    pub fn config_put(&self, req: ConfigWriteRequest) -> Result<(), AuthError> {
        use base64::Engine as _;
        let keytab_blob = base64::engine::general_purpose::STANDARD
            .decode(&req.keytab)
            .map_err(|_| AuthError::ConfigInvalid("keytab must be valid base64".into()))?;

        let cfg = Config {
            realm: req.realm,
            kdcs: req.kdcs,
            spn: req.spn,
            keytab: keytab_blob.clone().into(),
            clock_skew_sec: req.clock_skew_sec,
            allow_channel_binding: req.allow_channel_binding,
            realm_case_sensitive: req.realm_case_sensitive,
            spn_case_sensitive: req.spn_case_sensitive,
            realm_suffixes: req.realm_suffixes,
            spn_suffixes: req.spn_suffixes,
        };
        self.config_store.put(cfg)?;

        let keytab_store = Arc::new(KeytabStore::from_blob(keytab_blob, true)?);
        *self.keytab_store.lock() = Some(keytab_store);
        Ok(())
    }

    /// Read the current config, with `keytab` redacted.
    #[must_use]
    pub fn config_get(&self) -> Option<ConfigReadResponse> {
        self.config_store.get().map(|cfg| ConfigReadResponse {
            realm: cfg.realm,
            kdcs: cfg.kdcs,
            spn: cfg.spn,
            clock_skew_sec: cfg.clock_skew_sec,
            allow_channel_binding: cfg.allow_channel_binding,
            realm_case_sensitive: cfg.realm_case_sensitive,
            spn_case_sensitive: cfg.spn_case_sensitive,
            realm_suffixes: cfg.realm_suffixes,
            spn_suffixes: cfg.spn_suffixes,
        })
    }

    /// Delete the current config and drop the in-process keytab cache.
    pub fn config_delete(&self) {
        self.config_store.delete();
        *self.keytab_store.lock() = None;
    }

    /// Write (create or replace) a named role.
    ///
    /// # Errors
    ///
    /// See [`gmsa_store::RoleStore::put`].
    pub async fn role_put(&self, name: &str, req: RoleWriteRequest) -> Result<(), AuthError> {
        let role = Role {
            name: name.to_string(),
            allowed_realms: req.allowed_realms,
            allowed_spns: req.allowed_spns,
            bound_group_sids: req.bound_group_sids,
            token_policies: req.token_policies,
            deny_policies: req.deny_policies,
            merge_strategy: req.merge_strategy,
            token_type: req.token_type,
            period: req.period,
            max_ttl: req.max_ttl,
        };
        self.role_store.put(role).await
    }

    /// Read a named role.
    ///
    /// # Errors
    ///
    /// Propagates any backend error.
    pub async fn role_get(&self, name: &str) -> Result<Option<Role>, AuthError> {
        self.role_store.get(name).await
    }

    /// Delete a named role.
    ///
    /// # Errors
    ///
    /// Propagates any backend error.
    pub async fn role_delete(&self, name: &str) -> Result<(), AuthError> {
        self.role_store.delete(name).await
    }

    /// List all role names.
    ///
    /// # Errors
    ///
    /// Propagates any backend error.
    pub async fn roles_list(&self) -> Result<RoleListResponse, AuthError> {
        let mut keys: Vec<String> = self.role_store.list().await?.into_iter().map(|r| r.name).collect();
        keys.sort();
        Ok(RoleListResponse { keys })
    }

    /// Replace the group-SID -> policy-names mapping used by the union/
    /// intersection merge step. Not part of the spec's wire surface: hosts
    /// that want group-mapped policies configure this out of band (e.g.
    /// from a separate directory-sync job) before calling `login`.
    pub fn set_group_policies(&self, mapping: GroupPolicyMap) {
        *self.group_policies.lock() = mapping;
    }

    /// Run one login end to end.
    ///
    /// # Errors
    ///
    /// See [`gmsa_authz::handle_login`]. Additionally returns
    /// [`AuthError::ConfigInvalid`] if no config has been written yet.
    pub async fn login(&self, req: LoginWriteRequest) -> Result<AuthIssue, AuthError> {
        let config = self.config_store.get().ok_or_else(|| AuthError::ConfigInvalid("mount has no config".into()))?;
        let keytab_store = self.keytab_store.lock().clone().ok_or(AuthError::InvalidKeytab)?;
        let keytab = keytab_store.load()?;

        let request = gmsa_authz::LoginRequest { role: req.role, spnego: req.spnego, cb_tlse: req.cb_tlse };
        let group_policies = self.group_policies.lock().clone();

        let result = gmsa_authz::handle_login(&request, &keytab, &config, &self.role_store, &group_policies).await;
        match &result {
            Ok(_) => self.counters.record_login_success(),
            Err(e) => self.counters.record_login_failure(e.metric_slot()),
        }
        result
    }

    /// Liveness and version/feature info. `req.detailed` additionally
    /// includes a small system-info block.
    #[must_use]
    pub fn health(&self, req: &HealthRequest) -> HealthResponse {
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            features: Vec::new(),
            uptime_s: self.started_at.elapsed().as_secs(),
            system: req.detailed.then(|| SystemInfo {
                available_parallelism: std::thread::available_parallelism().ok().map(std::num::NonZeroUsize::get),
                target: std::env::consts::OS,
            }),
        }
    }

    /// Counter and rotation-status snapshot.
    #[must_use]
    pub fn metrics(&self) -> Snapshot {
        Snapshot::capture(&self.counters, self.rotation_status())
    }

    /// Write (create or replace) the rotation policy. Does not start or
    /// stop the background worker; call [`GmsaMount::rotation_start`]/
    /// [`GmsaMount::rotation_stop`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] on a shape violation.
    pub fn rotation_config_put(&self, cfg: RotationConfig, directory: Box<dyn DirectoryClient>, generator: Box<dyn KeytabGenerator>) -> Result<(), AuthError> {
        cfg.validate_shape()?;
        let keytab_store = self.keytab_store.lock().clone().ok_or(AuthError::InvalidKeytab)?;
        if let Some(existing) = self.rotation.lock().as_ref() {
            existing.update_config(cfg)?;
            return Ok(());
        }
        *self.rotation.lock() = Some(Arc::new(RotationManager::new(cfg, keytab_store, directory, generator)));
        Ok(())
    }

    /// Current rotation policy, if one was ever set. Unlike `Config`,
    /// there is no dedicated read-redaction: `admin_password` is a
    /// `SecretString` that never prints via `Debug`/`Display`, so the
    /// struct is safe to serialize as-is.
    #[must_use]
    pub fn rotation_config_get(&self) -> Option<RotationConfig> {
        self.rotation.lock().as_ref().map(|r| r.config())
    }

    /// Delete the rotation policy, stopping the worker first if running.
    pub async fn rotation_config_delete(&self) {
        self.rotation_stop().await;
        *self.rotation.lock() = None;
    }

    /// Current rotation state-machine status.
    #[must_use]
    pub fn rotation_status(&self) -> RotationStatus {
        self.rotation.lock().as_ref().map(|r| r.status()).unwrap_or_default()
    }

    /// Idempotently start the background rotation worker.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] if no rotation config has been
    /// written yet.
    pub async fn rotation_start(&self) -> Result<(), AuthError> {
        if self.rotation_worker.lock().is_some() {
            return Ok(());
        }
        let manager = self.rotation.lock().clone().ok_or_else(|| AuthError::ConfigInvalid("no rotation config set".into()))?;
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move { manager.run(task_cancel).await });
        *self.rotation_worker.lock() = Some(RunningWorker { cancel, handle });
        Ok(())
    }

    /// Idempotently stop the background rotation worker, waiting for the
    /// in-flight cycle (if any) to observe cancellation and exit.
    pub async fn rotation_stop(&self) {
        let worker = self.rotation_worker.lock().take();
        if let Some(worker) = worker {
            worker.cancel.cancel();
            let _ = worker.handle.await;
        }
    }

    /// Trigger one rotation attempt immediately, outside the normal
    /// `check_interval_sec` schedule, regardless of whether the
    /// background worker is running.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] if no rotation config has been
    /// written yet.
    pub async fn rotation_rotate_now(&self) -> Result<(), AuthError> {
        let manager = self.rotation.lock().clone().ok_or_else(|| AuthError::ConfigInvalid("no rotation config set".into()))?;
        let cancel = CancellationToken::new();
        manager.force_check(&cancel).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gmsa_rotation::PasswordMetadata;
    use gmsa_types::{EncType, KeytabEntry, SecretString};

    fn keytab_blob() -> Vec<u8> {
        gmsa_keytab::format::encode(&[KeytabEntry {
            principal: vec!["HTTP".into(), "vault.example.com".into()],
            realm: "EXAMPLE.COM".into(),
            kvno: 1,
            enctype: EncType::Aes256CtsHmacSha196,
            key: gmsa_types::SecretBytes::new(vec![0xAB; 32]),
        }])
    }

    fn config_request() -> ConfigWriteRequest {
        use base64::Engine as _;
        ConfigWriteRequest {
            realm: "EXAMPLE.COM".into(),
            kdcs: vec![],
            spn: "HTTP/vault.example.com".into(),
            keytab: base64::engine::general_purpose::STANDARD.encode(keytab_blob()),
            clock_skew_sec: 300,
            allow_channel_binding: false,
            realm_case_sensitive: true,
            spn_case_sensitive: true,
            realm_suffixes: vec![],
            spn_suffixes: vec![],
        }
    }

    #[test]
    fn config_put_then_get_round_trips_without_exposing_keytab() {
        let mount = GmsaMount::new();
        mount.config_put(config_request()).expect("config_put");
        let read = mount.config_get().expect("present");
        assert_eq!(read.realm, "EXAMPLE.COM");
        assert_eq!(read.spn, "HTTP/vault.example.com");
    }

    #[test]
    fn config_put_rejects_non_base64_keytab() {
        let mount = GmsaMount::new();
        let mut req = config_request();
        req.keytab = "not base64!!".into();
        assert!(mount.config_put(req).is_err());
    }

    #[tokio::test]
    async fn login_without_config_fails_fast() {
        let mount = GmsaMount::new();
        let req = LoginWriteRequest { role: "reader".into(), spnego: "QQ==".into(), cb_tlse: None };
        let err = mount.login(req).await.unwrap_err();
        assert!(matches!(err, AuthError::ConfigInvalid(_)));
    }

    #[tokio::test]
    async fn login_with_malformed_token_is_counted_as_a_failure() {
        let mount = GmsaMount::new();
        mount.config_put(config_request()).expect("config_put");
        let req = LoginWriteRequest { role: "reader".into(), spnego: "not-valid-base64!!".into(), cb_tlse: None };
        assert!(mount.login(req).await.is_err());
        assert_eq!(mount.metrics().logins_failed_total, 1);
    }

    #[tokio::test]
    async fn role_crud_round_trips() {
        let mount = GmsaMount::new();
        mount.role_put("reader", RoleWriteRequest {
            allowed_realms: Default::default(),
            allowed_spns: Default::default(),
            bound_group_sids: Default::default(),
            token_policies: vec!["default".into()],
            deny_policies: vec![],
            merge_strategy: gmsa_types::MergeStrategy::Union,
            token_type: gmsa_types::TokenType::Default,
            period: 0,
            max_ttl: 0,
        }).await.expect("put");

        assert_eq!(mount.roles_list().await.expect("list").keys, vec!["reader".to_string()]);
        assert!(mount.role_get("reader").await.expect("get").is_some());
        mount.role_delete("reader").await.expect("delete");
        assert!(mount.role_get("reader").await.expect("get").is_none());
    }

    #[test]
    fn health_reports_ok_and_nonzero_version() {
        let mount = GmsaMount::new();
        let health = mount.health(&HealthRequest::default());
        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
        assert!(health.system.is_none());
    }

    #[test]
    fn health_detailed_includes_system_info() {
        let mount = GmsaMount::new();
        let health = mount.health(&HealthRequest { detailed: true });
        assert!(health.system.is_some());
    }

    struct FakeDirectory;

    #[async_trait]
    impl DirectoryClient for FakeDirectory {
        async fn password_metadata(&self, _: &str, _: &str, _: &SecretString) -> Result<PasswordMetadata, AuthError> {
            Ok(PasswordMetadata { age_days: 0, expiry: None })
        }
    }

    struct FakeGenerator;

    #[async_trait]
    impl KeytabGenerator for FakeGenerator {
        async fn generate(&self, _: &str, _: &str, _: &SecretString) -> Result<Vec<u8>, AuthError> {
            Ok(keytab_blob())
        }
    }

    fn rotation_config() -> RotationConfig {
        RotationConfig {
            enabled: true,
            check_interval_sec: 3600,
            rotation_threshold_sec: 86_400,
            max_retries: 1,
            retry_delay_sec: 60,
            directory_address: "dc.example.com".into(),
            admin_username: "svc-rotator".into(),
            admin_password: SecretString::new("hunter2"),
            backup_keytabs: false,
            notification_endpoint: None,
        }
    }

    #[tokio::test]
    async fn rotation_rotate_now_without_config_fails() {
        let mount = GmsaMount::new();
        assert!(mount.rotation_rotate_now().await.is_err());
    }

    #[tokio::test]
    async fn rotation_start_stop_is_idempotent() {
        let mount = GmsaMount::new();
        mount.config_put(config_request()).expect("config_put");
        mount.rotation_config_put(rotation_config(), Box::new(FakeDirectory), Box::new(FakeGenerator)).expect("rotation_config_put");

        mount.rotation_start().await.expect("start");
        mount.rotation_start().await.expect("start again is a no-op");
        for _ in 0..10 {
            if mount.rotation_status().is_running {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(mount.rotation_status().is_running);

        mount.rotation_stop().await;
        mount.rotation_stop().await;
    }

    #[tokio::test]
    async fn rotation_rotate_now_runs_a_cycle_without_the_background_worker() {
        let mount = GmsaMount::new();
        mount.config_put(config_request()).expect("config_put");
        mount.rotation_config_put(rotation_config(), Box::new(FakeDirectory), Box::new(FakeGenerator)).expect("rotation_config_put");

        mount.rotation_rotate_now().await.expect("rotate");
        assert_eq!(mount.rotation_status().state, gmsa_types::RotationState::Idle);
    }
}
