//! Staged application of configuration to a live interface.
//!
//! An [`InterfaceApplier`] owns the two-phase commit for one interface:
//! `stage` validates and persists a pending model, `apply` pushes the
//! delta to the backend and promotes it to active. Any peer failure rolls
//! the live set back to the prior known-good state; a partial peer set is
//! never left live.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::conf;
use crate::error::{Result, WgError};
use crate::keys::PublicKey;
use crate::model::{ConfigModel, Interface, Peer};
use crate::store::ConfigStore;

/// Default bound on a single apply or teardown transition.
pub const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of a managed interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplyState {
    /// No configuration exists for the interface.
    #[default]
    Absent,
    /// A validated configuration is staged but not yet live.
    Staged,
    /// The staged configuration was applied and is live.
    Active,
    /// A new configuration is being applied over an active one.
    Reloading,
    /// The last transition timed out; live state is unknown.
    Failed,
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Staged => write!(f, "staged"),
            Self::Active => write!(f, "active"),
            Self::Reloading => write!(f, "reloading"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The mutating operations an applier performs against a live interface.
///
/// Implementations talk to whatever realizes the tunnel (kernel module,
/// userspace daemon); the applier only assumes calls complete quickly and
/// report failure honestly.
#[allow(async_fn_in_trait)]
pub trait WgBackend {
    /// Sets the interface-level configuration (key, address, port).
    async fn configure(&mut self, interface: &Interface) -> Result<()>;

    /// Adds a peer that is not currently present.
    async fn add_peer(&mut self, peer: &Peer) -> Result<()>;

    /// Replaces the configuration of a present peer.
    async fn update_peer(&mut self, peer: &Peer) -> Result<()>;

    /// Removes a present peer.
    async fn remove_peer(&mut self, public_key: &PublicKey) -> Result<()>;

    /// Removes all peers and interface configuration.
    async fn clear(&mut self) -> Result<()>;
}

#[derive(Clone)]
enum PeerOp {
    Add(Peer),
    Update { next: Peer, prior: Peer },
    Remove(Peer),
}

struct Inner<B, S> {
    backend: B,
    store: S,
    state: ApplyState,
    staged: Option<ConfigModel>,
    active: Option<ConfigModel>,
}

/// Two-phase configuration applier for a single interface.
///
/// All transitions run under one exclusive lock, so only one
/// stage/apply/teardown is in flight per interface at a time.
#[derive(Clone)]
pub struct InterfaceApplier<B, S> {
    inner: Arc<Mutex<Inner<B, S>>>,
    timeout: Duration,
}

impl<B: WgBackend, S: ConfigStore> InterfaceApplier<B, S> {
    /// Creates an applier in the `Absent` state.
    #[must_use]
    pub fn new(backend: B, store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                backend,
                store,
                state: ApplyState::Absent,
                staged: None,
                active: None,
            })),
            timeout: DEFAULT_APPLY_TIMEOUT,
        }
    }

    /// Creates an applier whose state is restored from the store's
    /// persisted staged/active slots.
    ///
    /// # Errors
    ///
    /// Returns an error if a persisted slot cannot be read or parsed.
    pub fn resume(backend: B, store: S) -> Result<Self> {
        let active = store
            .load_active()?
            .map(|text| conf::from_conf(&text))
            .transpose()?;
        let staged = store
            .load_staged()?
            .map(|text| conf::from_conf(&text))
            .transpose()?;
        let state = match (&active, &staged) {
            (_, Some(_)) => ApplyState::Staged,
            (Some(_), None) => ApplyState::Active,
            (None, None) => ApplyState::Absent,
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                backend,
                store,
                state,
                staged,
                active,
            })),
            timeout: DEFAULT_APPLY_TIMEOUT,
        })
    }

    /// Sets the transition time budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the current lifecycle state.
    pub async fn state(&self) -> ApplyState {
        self.inner.lock().await.state
    }

    /// Returns a copy of the live model, if any.
    pub async fn active_model(&self) -> Option<ConfigModel> {
        self.inner.lock().await.active.clone()
    }

    /// Returns a copy of the staged model, if any.
    pub async fn staged_model(&self) -> Option<ConfigModel> {
        self.inner.lock().await.staged.clone()
    }

    /// Validates `model` and stages it for the next apply.
    ///
    /// Staging is accepted from every state, including `Failed`: after a
    /// timed-out transition the live peer set is unknown, and staging a
    /// fresh model followed by `apply` is the recovery path that brings
    /// the interface back to a known configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WgError::ValidationFailed`] with the complete violation
    /// list if the model is invalid; nothing is staged in that case.
    pub async fn stage(&self, model: ConfigModel) -> Result<()> {
        let violations = model.validate();
        if !violations.is_empty() {
            return Err(WgError::ValidationFailed(violations));
        }

        let mut inner = self.inner.lock().await;
        inner.store.save_staged(&conf::to_conf(&model))?;
        inner.staged = Some(model);
        inner.state = ApplyState::Staged;
        info!("staged configuration");
        Ok(())
    }

    /// Applies the staged configuration to the live interface.
    ///
    /// Only the delta against the prior live peer set is pushed: peers
    /// whose configuration is unchanged are not disturbed. On any peer
    /// failure the live set is rolled back to the prior state and
    /// [`WgError::ApplyFailed`] is returned. If the backend does not
    /// respond within the time budget the applier transitions to
    /// `Failed` and returns [`WgError::Timeout`].
    pub async fn apply(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let Some(next) = inner.staged.clone() else {
            return Err(WgError::ApplyFailed("no staged configuration".to_string()));
        };

        let prior = inner.active.clone();
        inner.state = if prior.is_some() {
            ApplyState::Reloading
        } else {
            ApplyState::Staged
        };

        let plan = diff(prior.as_ref(), &next);
        let reconfigure = prior.as_ref().map(ConfigModel::interface) != Some(next.interface());

        let Inner { backend, .. } = &mut *inner;
        let mut completed: Vec<PeerOp> = Vec::new();
        let mut configured = false;

        let outcome = tokio::time::timeout(
            self.timeout,
            run_plan(backend, &plan, reconfigure, next.interface(), &mut completed, &mut configured),
        )
        .await;

        match outcome {
            Err(_) => {
                // The transition was cut off mid-flight; the live state is
                // unknown, so no rollback is attempted.
                inner.state = ApplyState::Failed;
                warn!(timeout = ?self.timeout, "apply timed out");
                Err(WgError::Timeout(self.timeout))
            }
            Ok(Ok(())) => {
                let text = conf::to_conf(&next);
                inner.store.save_active(&text)?;
                inner.store.clear_staged()?;
                inner.active = Some(next);
                inner.staged = None;
                inner.state = ApplyState::Active;
                info!(peers = inner.active.as_ref().map_or(0, |m| m.peers().len()), "applied configuration");
                Ok(())
            }
            Ok(Err(e)) => {
                let Inner { backend, .. } = &mut *inner;
                rollback(backend, &completed, configured, prior.as_ref().map(ConfigModel::interface)).await;
                // The staged model is kept so the caller can retry after
                // fixing the backend condition.
                inner.state = if prior.is_some() {
                    ApplyState::Active
                } else {
                    ApplyState::Staged
                };
                warn!(error = %e, "apply failed, rolled back to prior state");
                Err(WgError::ApplyFailed(e.to_string()))
            }
        }
    }

    /// Removes all live peers and configuration. Idempotent when already
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`WgError::Timeout`] and transitions to `Failed` if the
    /// backend does not respond within the time budget.
    pub async fn teardown(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == ApplyState::Absent {
            return Ok(());
        }

        let Inner { backend, .. } = &mut *inner;
        if tokio::time::timeout(self.timeout, backend.clear()).await.is_err() {
            inner.state = ApplyState::Failed;
            return Err(WgError::Timeout(self.timeout));
        }

        inner.store.clear_staged()?;
        inner.store.clear_active()?;
        inner.staged = None;
        inner.active = None;
        inner.state = ApplyState::Absent;
        info!("tore down interface");
        Ok(())
    }
}

/// Computes the peer delta between the prior live model and the next one:
/// removals in prior order, then updates and additions in next order.
fn diff(prior: Option<&ConfigModel>, next: &ConfigModel) -> Vec<PeerOp> {
    let prior_peers: HashMap<[u8; 32], &Peer> = prior
        .map(|m| {
            m.peers()
                .iter()
                .map(|p| (*p.public_key.as_bytes(), p))
                .collect()
        })
        .unwrap_or_default();

    let mut plan = Vec::new();

    if let Some(prior) = prior {
        for old in prior.peers() {
            if next.peer(&old.public_key).is_none() {
                plan.push(PeerOp::Remove(old.clone()));
            }
        }
    }

    for peer in next.peers() {
        match prior_peers.get(peer.public_key.as_bytes()) {
            None => plan.push(PeerOp::Add(peer.clone())),
            Some(old) if *old != peer => plan.push(PeerOp::Update {
                next: peer.clone(),
                prior: (*old).clone(),
            }),
            Some(_) => {} // unchanged; leave its session undisturbed
        }
    }

    plan
}

async fn run_plan<B: WgBackend>(
    backend: &mut B,
    plan: &[PeerOp],
    reconfigure: bool,
    interface: &Interface,
    completed: &mut Vec<PeerOp>,
    configured: &mut bool,
) -> Result<()> {
    if reconfigure {
        backend.configure(interface).await?;
        *configured = true;
    }
    for op in plan {
        match op {
            PeerOp::Add(peer) => backend.add_peer(peer).await?,
            PeerOp::Update { next, .. } => backend.update_peer(next).await?,
            PeerOp::Remove(peer) => backend.remove_peer(&peer.public_key).await?,
        }
        completed.push(op.clone());
    }
    Ok(())
}

/// Undoes completed operations in reverse order. Best effort: individual
/// undo failures are logged, not propagated, so as much of the prior
/// state as possible is restored.
async fn rollback<B: WgBackend>(
    backend: &mut B,
    completed: &[PeerOp],
    configured: bool,
    prior_interface: Option<&Interface>,
) {
    for op in completed.iter().rev() {
        let undo = match op {
            PeerOp::Add(peer) => backend.remove_peer(&peer.public_key).await,
            PeerOp::Update { prior, .. } => backend.update_peer(prior).await,
            PeerOp::Remove(peer) => backend.add_peer(peer).await,
        };
        if let Err(e) = undo {
            warn!(error = %e, "rollback step failed");
        }
    }
    if configured {
        if let Some(interface) = prior_interface {
            if let Err(e) = backend.configure(interface).await {
                warn!(error = %e, "rollback of interface configuration failed");
            }
        }
    }
    debug!(ops = completed.len(), "rolled back applied operations");
}

/// An in-memory backend that records every operation.
///
/// Doubles as the test double and as the stand-in backend when no kernel
/// or daemon integration is wired up. Individual peers can be scripted to
/// fail, exercising the rollback path.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryBackendState>>,
}

#[derive(Default)]
struct MemoryBackendState {
    interface: Option<Interface>,
    peers: HashMap<[u8; 32], Peer>,
    log: Vec<String>,
    fail_keys: Vec<PublicKey>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts every add/update of `key` to fail.
    pub async fn fail_on(&self, key: PublicKey) {
        self.state.write().await.fail_keys.push(key);
    }

    /// Returns the operations performed so far, oldest first.
    pub async fn op_log(&self) -> Vec<String> {
        self.state.read().await.log.clone()
    }

    /// Returns the number of live peers.
    pub async fn live_peer_count(&self) -> usize {
        self.state.read().await.peers.len()
    }

    /// Returns whether a peer with `key` is live.
    pub async fn has_peer(&self, key: &PublicKey) -> bool {
        self.state.read().await.peers.contains_key(key.as_bytes())
    }

    /// Returns the live peer with `key`, if present.
    pub async fn live_peer(&self, key: &PublicKey) -> Option<Peer> {
        self.state.read().await.peers.get(key.as_bytes()).cloned()
    }

    /// Returns the live interface configuration, if set.
    pub async fn live_interface(&self) -> Option<Interface> {
        self.state.read().await.interface.clone()
    }
}

impl WgBackend for MemoryBackend {
    async fn configure(&mut self, interface: &Interface) -> Result<()> {
        let mut state = self.state.write().await;
        state.log.push("configure".to_string());
        state.interface = Some(interface.clone());
        Ok(())
    }

    async fn add_peer(&mut self, peer: &Peer) -> Result<()> {
        let mut state = self.state.write().await;
        let key = peer.public_key;
        if state.fail_keys.contains(&key) {
            return Err(WgError::ApplyFailed(format!("backend rejected peer {key}")));
        }
        state.log.push(format!("add {key}"));
        state.peers.insert(*key.as_bytes(), peer.clone());
        Ok(())
    }

    async fn update_peer(&mut self, peer: &Peer) -> Result<()> {
        let mut state = self.state.write().await;
        let key = peer.public_key;
        if state.fail_keys.contains(&key) {
            return Err(WgError::ApplyFailed(format!("backend rejected peer {key}")));
        }
        state.log.push(format!("update {key}"));
        state.peers.insert(*key.as_bytes(), peer.clone());
        Ok(())
    }

    async fn remove_peer(&mut self, public_key: &PublicKey) -> Result<()> {
        let mut state = self.state.write().await;
        state.log.push(format!("remove {public_key}"));
        state.peers.remove(public_key.as_bytes());
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        let mut state = self.state.write().await;
        state.log.push("clear".to_string());
        state.peers.clear();
        state.interface = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{PrivateKey, KEY_SIZE};
    use crate::store::MemoryStore;
    use crate::types::AllowedIp;

    fn test_private_key() -> PrivateKey {
        PrivateKey::from_bytes_clamped([1u8; KEY_SIZE])
    }

    fn test_public_key(seed: u8) -> PublicKey {
        PrivateKey::from_bytes_clamped([seed; KEY_SIZE]).public_key()
    }

    fn test_interface() -> Interface {
        let address = AllowedIp::from_cidr("10.0.0.1/24").expect("valid cidr");
        Interface::new(test_private_key(), address).with_listen_port(51820)
    }

    fn peer(seed: u8, cidr: &str) -> Peer {
        Peer::new(test_public_key(seed))
            .with_allowed_ip(AllowedIp::from_cidr(cidr).expect("valid cidr"))
    }

    fn model_with_peers(peers: Vec<Peer>) -> ConfigModel {
        let mut model = ConfigModel::new(test_interface());
        for p in peers {
            model.add_peer(p).expect("add peer");
        }
        model
    }

    fn applier() -> (InterfaceApplier<MemoryBackend, MemoryStore>, MemoryBackend) {
        let backend = MemoryBackend::new();
        let applier = InterfaceApplier::new(backend.clone(), MemoryStore::new());
        (applier, backend)
    }

    /// A backend whose peer and clear operations never complete.
    #[derive(Clone, Default)]
    struct StalledBackend;

    impl WgBackend for StalledBackend {
        async fn configure(&mut self, _interface: &Interface) -> Result<()> {
            Ok(())
        }

        async fn add_peer(&mut self, _peer: &Peer) -> Result<()> {
            std::future::pending().await
        }

        async fn update_peer(&mut self, _peer: &Peer) -> Result<()> {
            std::future::pending().await
        }

        async fn remove_peer(&mut self, _public_key: &PublicKey) -> Result<()> {
            std::future::pending().await
        }

        async fn clear(&mut self) -> Result<()> {
            std::future::pending().await
        }
    }

    fn stalled_applier() -> InterfaceApplier<StalledBackend, MemoryStore> {
        InterfaceApplier::new(StalledBackend, MemoryStore::new())
            .with_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn starts_absent() {
        let (applier, _) = applier();
        assert_eq!(applier.state().await, ApplyState::Absent);
    }

    #[tokio::test]
    async fn stage_then_apply_goes_active() {
        let (applier, backend) = applier();
        let model = model_with_peers(vec![peer(2, "10.0.0.2/32")]);

        applier.stage(model).await.expect("stage");
        assert_eq!(applier.state().await, ApplyState::Staged);

        applier.apply().await.expect("apply");
        assert_eq!(applier.state().await, ApplyState::Active);
        assert_eq!(backend.live_peer_count().await, 1);
        assert!(backend.has_peer(&test_public_key(2)).await);
    }

    #[tokio::test]
    async fn stage_rejects_invalid_model_with_all_violations() {
        let (applier, _) = applier();
        let zero = PublicKey::from_bytes_array([0u8; KEY_SIZE]);
        let bad = Peer::new(zero); // invalid key and no allowed IPs
        let model = ConfigModel::from_parts(test_interface(), vec![bad]);

        let Err(WgError::ValidationFailed(violations)) = applier.stage(model).await else {
            unreachable!("expected validation failure");
        };
        assert_eq!(violations.len(), 2);
        assert_eq!(applier.state().await, ApplyState::Absent);
    }

    #[tokio::test]
    async fn apply_without_stage_fails() {
        let (applier, _) = applier();
        assert!(matches!(
            applier.apply().await,
            Err(WgError::ApplyFailed(_))
        ));
    }

    #[tokio::test]
    async fn invalid_staged_model_never_mutates_live_set() {
        let (applier, backend) = applier();
        let good = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        applier.stage(good).await.expect("stage");
        applier.apply().await.expect("apply");

        // A peer with a malformed (all-zero) public key fails validation
        // at stage time; the live set must remain the prior active one.
        let zero = PublicKey::from_bytes_array([0u8; KEY_SIZE]);
        let bad_peer = Peer::new(zero)
            .with_allowed_ip(AllowedIp::from_cidr("10.0.0.3/32").expect("valid cidr"));
        let bad = ConfigModel::from_parts(test_interface(), vec![bad_peer]);

        assert!(matches!(
            applier.stage(bad).await,
            Err(WgError::ValidationFailed(_))
        ));
        assert_eq!(applier.state().await, ApplyState::Active);
        assert_eq!(backend.live_peer_count().await, 1);
        assert!(backend.has_peer(&test_public_key(2)).await);
    }

    #[tokio::test]
    async fn backend_failure_rolls_back_to_prior_peer_set() {
        let (applier, backend) = applier();
        let first = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        applier.stage(first).await.expect("stage");
        applier.apply().await.expect("apply");

        backend.fail_on(test_public_key(4)).await;
        let second = model_with_peers(vec![peer(3, "10.0.0.3/32"), peer(4, "10.0.0.4/32")]);
        applier.stage(second).await.expect("stage");

        let result = applier.apply().await;
        assert!(matches!(result, Err(WgError::ApplyFailed(_))));

        // Prior active set restored: peer 2 live, peers 3 and 4 not.
        assert!(backend.has_peer(&test_public_key(2)).await);
        assert!(!backend.has_peer(&test_public_key(3)).await);
        assert!(!backend.has_peer(&test_public_key(4)).await);
        assert_eq!(backend.live_peer_count().await, 1);
    }

    #[tokio::test]
    async fn reload_only_touches_the_delta() {
        let (applier, backend) = applier();
        let keep = peer(2, "10.0.0.2/32");
        let drop_me = peer(3, "10.0.0.3/32");
        let first = model_with_peers(vec![keep.clone(), drop_me]);
        applier.stage(first).await.expect("stage");
        applier.apply().await.expect("apply");

        let before = backend.op_log().await.len();

        // Same interface, keep peer 2 untouched, drop peer 3, add peer 4.
        let second = model_with_peers(vec![keep, peer(4, "10.0.0.4/32")]);
        applier.stage(second).await.expect("stage");
        applier.apply().await.expect("apply");

        let ops = backend.op_log().await[before..].to_vec();
        let keep_key = test_public_key(2).to_string();
        assert!(
            ops.iter().all(|op| !op.contains(&keep_key)),
            "unchanged peer was disturbed: {ops:?}"
        );
        assert_eq!(ops.len(), 2); // one remove, one add
        assert!(backend.has_peer(&test_public_key(2)).await);
        assert!(backend.has_peer(&test_public_key(4)).await);
        assert!(!backend.has_peer(&test_public_key(3)).await);
    }

    #[tokio::test]
    async fn changed_peer_is_updated_in_place() {
        let (applier, backend) = applier();
        let first = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        applier.stage(first).await.expect("stage");
        applier.apply().await.expect("apply");

        let changed = peer(2, "10.0.0.2/32").with_persistent_keepalive(25);
        let second = model_with_peers(vec![changed.clone()]);
        applier.stage(second).await.expect("stage");
        applier.apply().await.expect("apply");

        let live = backend.live_peer(&test_public_key(2)).await.expect("live peer");
        assert_eq!(live.persistent_keepalive, Some(25));
    }

    #[tokio::test]
    async fn teardown_clears_everything_and_is_idempotent() {
        let (applier, backend) = applier();
        let model = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        applier.stage(model).await.expect("stage");
        applier.apply().await.expect("apply");

        applier.teardown().await.expect("teardown");
        assert_eq!(applier.state().await, ApplyState::Absent);
        assert_eq!(backend.live_peer_count().await, 0);

        applier.teardown().await.expect("teardown again");
        assert_eq!(applier.state().await, ApplyState::Absent);
    }

    #[tokio::test]
    async fn apply_timeout_transitions_to_failed() {
        let applier = stalled_applier();
        let model = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        applier.stage(model).await.expect("stage");

        let result = applier.apply().await;
        assert!(matches!(result, Err(WgError::Timeout(_))));
        assert_eq!(applier.state().await, ApplyState::Failed);
    }

    #[tokio::test]
    async fn teardown_timeout_transitions_to_failed() {
        let applier = stalled_applier();
        let model = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        applier.stage(model).await.expect("stage");

        let result = applier.teardown().await;
        assert!(matches!(result, Err(WgError::Timeout(_))));
        assert_eq!(applier.state().await, ApplyState::Failed);
    }

    #[tokio::test]
    async fn stage_after_failure_starts_recovery() {
        let applier = stalled_applier();
        let model = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        applier.stage(model.clone()).await.expect("stage");
        assert!(applier.apply().await.is_err());
        assert_eq!(applier.state().await, ApplyState::Failed);

        // Staging a fresh model from Failed is the recovery path.
        applier.stage(model).await.expect("stage after failure");
        assert_eq!(applier.state().await, ApplyState::Staged);
    }

    #[tokio::test]
    async fn resume_restores_active_state_from_store() {
        let mut store = MemoryStore::new();
        let model = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        store.save_active(&conf::to_conf(&model)).expect("save");

        let applier =
            InterfaceApplier::resume(MemoryBackend::new(), store).expect("resume");
        assert_eq!(applier.state().await, ApplyState::Active);
        let active = applier.active_model().await.expect("active model");
        assert_eq!(active.peers().len(), 1);
    }

    #[tokio::test]
    async fn stage_persists_to_store() {
        let (applier, _) = applier();
        let model = model_with_peers(vec![peer(2, "10.0.0.2/32")]);
        applier.stage(model.clone()).await.expect("stage");

        let staged = applier.staged_model().await.expect("staged model");
        assert_eq!(staged, model);
    }
}
