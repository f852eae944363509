//! The user data manager.
//!
//! Owns the in-memory caches of starred debates and reading progress and
//! picks the backing store per call: the backend while the session is
//! active, the local database otherwise. Cache writes happen only after
//! the backing write succeeded.

use crate::{UserDataError, UserDataResult};
use agora_api::endpoints::{GetProgress, GetStarred, PostBatchProgress, PostProgress, PostStarred};
use agora_api::NetworkClient;
use agora_auth::{SessionHooks, SessionManager};
use agora_config_and_utils::models::{DebateId, PointId, Progress};
use agora_config_and_utils::notify::Notifier;
use agora_local_store::LocalStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Whether the caches reflect a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotAttempted,
    Loaded,
    Failed,
}

/// A unit of work that can be retried on its own from an error banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    OpenLocalStore,
    LoadStarred,
    LoadProgress,
    PushStarred,
    PushProgress,
}

/// Result of the latest run of each load step; `None` until it ran.
#[derive(Debug, Default)]
struct LoadOutcome {
    starred: Option<bool>,
    progress: Option<bool>,
}

pub struct UserDataManager {
    me: Weak<UserDataManager>,
    session: Arc<SessionManager>,
    client: Arc<NetworkClient>,
    store: Arc<LocalStore>,
    notifier: Arc<dyn Notifier>,
    starred: watch::Sender<BTreeSet<DebateId>>,
    progress: watch::Sender<BTreeMap<DebateId, Progress>>,
    load_state: watch::Sender<LoadState>,
    outcome: Mutex<LoadOutcome>,
    // Bumped on every clear; outcomes of steps that straddle a clear are dropped.
    generation: AtomicU64,
}

impl std::fmt::Debug for UserDataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDataManager")
            .field("starred", &self.starred.borrow().len())
            .field("progress", &self.progress.borrow().len())
            .field("load_state", &*self.load_state.borrow())
            .finish_non_exhaustive()
    }
}

impl UserDataManager {
    /// Build the manager and register it as the session's hooks.
    pub fn new(
        session: Arc<SessionManager>,
        client: Arc<NetworkClient>,
        store: Arc<LocalStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let manager = Arc::new_cyclic(|me: &Weak<UserDataManager>| {
            let (starred, _) = watch::channel(BTreeSet::new());
            let (progress, _) = watch::channel(BTreeMap::new());
            let (load_state, _) = watch::channel(LoadState::NotAttempted);
            Self {
                me: me.clone(),
                session,
                client,
                store,
                notifier,
                starred,
                progress,
                load_state,
                outcome: Mutex::new(LoadOutcome::default()),
                generation: AtomicU64::new(0),
            }
        });
        let hooks: Weak<dyn SessionHooks> = Arc::downgrade(&manager) as Weak<dyn SessionHooks>;
        manager.session.set_hooks(hooks);
        manager
    }

    // ==========================================
    // Cache reads
    // ==========================================

    pub fn is_starred(&self, debate_id: DebateId) -> bool {
        self.starred.borrow().contains(&debate_id)
    }

    /// Starred debates in ascending id order.
    pub fn starred(&self) -> Vec<DebateId> {
        self.starred.borrow().iter().copied().collect()
    }

    pub fn progress_map(&self) -> BTreeMap<DebateId, Progress> {
        self.progress.borrow().clone()
    }

    pub fn load_state(&self) -> LoadState {
        *self.load_state.borrow()
    }

    pub fn subscribe_starred(&self) -> watch::Receiver<BTreeSet<DebateId>> {
        self.starred.subscribe()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<BTreeMap<DebateId, Progress>> {
        self.progress.subscribe()
    }

    pub fn subscribe_load_state(&self) -> watch::Receiver<LoadState> {
        self.load_state.subscribe()
    }

    /// Cached progress for `debate_id`, inserting an empty record if absent.
    pub fn get_progress(&self, debate_id: DebateId) -> Progress {
        let mut found = None;
        self.progress.send_if_modified(|map| match map.get(&debate_id) {
            Some(progress) => {
                found = Some(progress.clone());
                false
            }
            None => {
                map.insert(debate_id, Progress::empty(debate_id));
                true
            }
        });
        found.unwrap_or_else(|| Progress::empty(debate_id))
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Star or unstar a debate. No I/O when the cache already matches.
    pub async fn star_or_unstar(&self, debate_id: DebateId, unstar: bool) -> UserDataResult<()> {
        if self.is_starred(debate_id) != unstar {
            debug!(debate_id, unstar, "Star state already current");
            return Ok(());
        }

        if self.session.is_active() {
            let endpoint = if unstar {
                PostStarred::unstar(debate_id)
            } else {
                PostStarred::star(debate_id)
            };
            self.client.execute(&endpoint).await?;
        } else {
            self.store.set_starred(debate_id, !unstar).await?;
        }

        self.starred.send_if_modified(|set| {
            if unstar {
                set.remove(&debate_id)
            } else {
                set.insert(debate_id)
            }
        });
        info!(debate_id, unstar, "Star state updated");
        Ok(())
    }

    /// Mark one point seen. No I/O when it already was.
    pub async fn mark_progress(
        &self,
        point_id: PointId,
        debate_id: DebateId,
        total_points: u32,
    ) -> UserDataResult<()> {
        self.mark_seen(debate_id, &[point_id], total_points, false).await
    }

    /// Mark several points seen with one backend call or one local write.
    ///
    /// The input is deduplicated and reduced to unseen points first; nothing
    /// happens when none remain.
    pub async fn mark_batch_progress(
        &self,
        point_ids: &[PointId],
        debate_id: DebateId,
        total_points: u32,
    ) -> UserDataResult<()> {
        self.mark_seen(debate_id, point_ids, total_points, true).await
    }

    async fn mark_seen(
        &self,
        debate_id: DebateId,
        candidates: &[PointId],
        total_points: u32,
        batch: bool,
    ) -> UserDataResult<()> {
        let current = self.get_progress(debate_id);
        let fresh = current.unseen(candidates);
        if fresh.is_empty() {
            debug!(debate_id, "Points already seen");
            return Ok(());
        }

        if self.session.is_active() {
            if batch {
                self.client
                    .execute(&PostBatchProgress::single(debate_id, fresh.clone()))
                    .await?;
            } else {
                for &point_id in &fresh {
                    self.client
                        .execute(&PostProgress {
                            debate_id,
                            point_id,
                        })
                        .await?;
                }
            }
        } else {
            let percentage = current.with_seen(&fresh, total_points).completed_percentage;
            self.store
                .add_seen_points(debate_id, fresh.clone(), percentage)
                .await?;
        }

        self.progress.send_modify(|map| {
            let entry = map
                .entry(debate_id)
                .or_insert_with(|| Progress::empty(debate_id));
            *entry = entry.with_seen(&fresh, total_points);
        });
        info!(debate_id, points = fresh.len(), "Progress updated");
        Ok(())
    }

    // ==========================================
    // Load and sync
    // ==========================================

    /// Fill the caches from the backend or the local store.
    ///
    /// Starred loads before progress so a refresh triggered by the first call
    /// is in place for the second. Failed steps show a banner whose retry
    /// re-runs only that step.
    pub async fn load_user_data(&self) -> LoadState {
        *self.outcome.lock() = LoadOutcome::default();
        let active = self.session.is_active();

        if !active && !self.run_step(Step::OpenLocalStore).await {
            self.load_state.send_replace(LoadState::Failed);
            return LoadState::Failed;
        }

        self.run_step(Step::LoadStarred).await;
        if self.session.is_active() != active {
            // A forced logout already cleared the caches.
            debug!("Session changed during load, stopping");
            return self.load_state();
        }
        self.run_step(Step::LoadProgress).await;
        self.load_state()
    }

    /// Push local-only data to the backend after login, then reload.
    ///
    /// Each push clears its local table only after the backend accepted it.
    /// A failed push does not stop the other push or the reload.
    pub async fn sync_user_data_to_backend(&self) {
        info!("Syncing local data to backend");
        self.run_step(Step::PushStarred).await;
        self.run_step(Step::PushProgress).await;
        self.load_user_data().await;
    }

    /// Drop cached data and close the local store for the next session.
    pub async fn clear_user_data(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.starred.send_replace(BTreeSet::new());
        self.progress.send_replace(BTreeMap::new());
        self.load_state.send_replace(LoadState::NotAttempted);
        *self.outcome.lock() = LoadOutcome::default();
        self.store.rearm().await;
        info!("User data cleared");
    }

    /// Run one step, record its outcome, and report its failure.
    async fn run_step(&self, step: Step) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        let result = match step {
            Step::OpenLocalStore => self
                .store
                .load_persistent_store()
                .await
                .map_err(UserDataError::from),
            Step::LoadStarred => self.load_starred().await,
            Step::LoadProgress => self.load_progress().await,
            Step::PushStarred => self.push_starred().await,
            Step::PushProgress => self.push_progress().await,
        };
        let ok = result.is_ok();

        if generation != self.generation.load(Ordering::SeqCst) {
            debug!(step = ?step, "User data cleared during step, outcome dropped");
        } else {
            match step {
                Step::LoadStarred => self.record(|outcome| outcome.starred = Some(ok)),
                Step::LoadProgress => self.record(|outcome| outcome.progress = Some(ok)),
                _ => {}
            }
        }

        if let Err(error) = result {
            warn!(step = ?step, error = %error, "User data step failed");
            self.report(step, &error);
        }
        ok
    }

    fn record(&self, update: impl FnOnce(&mut LoadOutcome)) {
        let state = {
            let mut outcome = self.outcome.lock();
            update(&mut outcome);
            match (outcome.starred, outcome.progress) {
                (Some(true), Some(true)) => LoadState::Loaded,
                (Some(_), Some(_)) => LoadState::Failed,
                _ => return,
            }
        };
        self.load_state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    /// Show the failure banner with a retry bound to `step`.
    fn report(&self, step: Step, error: &UserDataError) {
        let me = self.me.clone();
        let runtime = tokio::runtime::Handle::try_current().ok();
        error.report_with_retry(self.notifier.as_ref(), move || {
            let (Some(manager), Some(runtime)) = (me.upgrade(), runtime) else {
                return;
            };
            runtime.spawn(async move {
                info!(step = ?step, "Retrying user data step");
                manager.retry(step).await;
            });
        });
    }

    async fn retry(&self, step: Step) {
        if step == Step::OpenLocalStore {
            self.load_user_data().await;
        } else {
            self.run_step(step).await;
        }
    }

    async fn load_starred(&self) -> UserDataResult<()> {
        let starred: BTreeSet<DebateId> = if self.session.is_active() {
            self.client
                .execute(&GetStarred)
                .await?
                .starred_list
                .into_iter()
                .collect()
        } else {
            self.store.fetch_starred().await?.into_iter().collect()
        };
        debug!(count = starred.len(), "Starred loaded");
        self.starred.send_replace(starred);
        Ok(())
    }

    async fn load_progress(&self) -> UserDataResult<()> {
        let records: Vec<Progress> = if self.session.is_active() {
            self.client
                .execute(&GetProgress)
                .await?
                .into_iter()
                .map(Progress::from)
                .collect()
        } else {
            self.store.fetch_progress().await?
        };
        debug!(count = records.len(), "Progress loaded");
        let map = records
            .into_iter()
            .map(|progress| (progress.debate_id, progress))
            .collect();
        self.progress.send_replace(map);
        Ok(())
    }

    async fn push_starred(&self) -> UserDataResult<()> {
        self.store.load_persistent_store().await?;
        let local = self.store.fetch_starred().await?;
        if local.is_empty() {
            debug!("No local stars to push");
            return Ok(());
        }

        let count = local.len();
        self.client
            .execute(&PostStarred {
                starred: local,
                unstarred: Vec::new(),
            })
            .await?;
        self.store.clear_starred().await?;
        info!(count, "Pushed local stars");
        Ok(())
    }

    async fn push_progress(&self) -> UserDataResult<()> {
        self.store.load_persistent_store().await?;
        let entries: Vec<(DebateId, Vec<PointId>)> = self
            .store
            .fetch_progress()
            .await?
            .into_iter()
            .filter(|progress| !progress.seen_points.is_empty())
            .map(|progress| (progress.debate_id, progress.seen_points))
            .collect();
        if entries.is_empty() {
            debug!("No local progress to push");
            return Ok(());
        }

        let count = entries.len();
        self.client.execute(&PostBatchProgress { entries }).await?;
        self.store.clear_progress().await?;
        info!(debates = count, "Pushed local progress");
        Ok(())
    }
}

#[async_trait]
impl SessionHooks for UserDataManager {
    async fn on_login(&self) {
        self.sync_user_data_to_backend().await;
    }

    /// Clear the signed-in data, then reopen the local store and load it so
    /// the anonymous session can write straight away.
    async fn on_logout(&self) {
        self.clear_user_data().await;
        self.load_user_data().await;
    }
}
