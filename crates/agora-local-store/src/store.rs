//! User-data facade over the async database.
//!
//! `LocalStore` owns the lifecycle of the on-device database for anonymous
//! sessions: it is opened lazily by [`LocalStore::load_persistent_store`],
//! dropped by [`LocalStore::rearm`] on logout, and refuses every CRUD call
//! while closed. Corruption found by a unique fetch is reported to the user
//! here, once, with a non-retryable banner.

use crate::{queries, AsyncDatabase, DatabaseError, DatabaseResult, Progress};
use agora_config_and_utils::models::{DebateId, PointId};
use agora_config_and_utils::notify::{Banner, Notifier};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Title of the banner shown when local data violates a uniqueness invariant.
pub const DATA_CORRUPTED_TITLE: &str = "Data corrupted, please reinstall";

pub struct LocalStore {
    path: PathBuf,
    db: Mutex<Option<AsyncDatabase>>,
    notifier: Arc<dyn Notifier>,
}

impl LocalStore {
    /// A closed store for the database at `path`.
    pub fn new(path: impl Into<PathBuf>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            path: path.into(),
            db: Mutex::new(None),
            notifier,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_loaded(&self) -> bool {
        self.db.lock().await.is_some()
    }

    /// Open and migrate the database. A no-op when already open.
    pub async fn load_persistent_store(&self) -> DatabaseResult<()> {
        let mut guard = self.db.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        match AsyncDatabase::open(&self.path).await {
            Ok(db) => {
                *guard = Some(db);
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to load local store");
                Err(e)
            }
        }
    }

    /// Close the database so the next anonymous session starts from a fresh load.
    pub async fn rearm(&self) {
        let db = self.db.lock().await.take();
        if let Some(db) = db {
            if let Err(e) = db.close().await {
                warn!(error = %e, "Closing local store during rearm failed");
            }
            info!("Local store re-armed");
        }
    }

    async fn handle(&self) -> DatabaseResult<AsyncDatabase> {
        self.db.lock().await.clone().ok_or(DatabaseError::NotLoaded)
    }

    fn surface<T>(&self, result: DatabaseResult<T>) -> DatabaseResult<T> {
        if let Err(DatabaseError::Corrupted { entity, count }) = &result {
            error!(entity, count, "Local store uniqueness violated");
            self.notifier.show(Banner::error(DATA_CORRUPTED_TITLE));
        }
        result
    }

    /// Starred debate ids, oldest first.
    pub async fn fetch_starred(&self) -> DatabaseResult<Vec<DebateId>> {
        let db = self.handle().await?;
        let records = db.call(queries::list_starred).await?;
        Ok(records.into_iter().map(|r| r.debate_id).collect())
    }

    /// Make the stored state for `debate_id` match `starred`.
    pub async fn set_starred(&self, debate_id: DebateId, starred: bool) -> DatabaseResult<()> {
        let db = self.handle().await?;
        let result = db
            .call(move |conn| match (queries::find_starred(conn, debate_id)?, starred) {
                (None, true) => queries::insert_starred(conn, debate_id).map(|_| ()),
                (Some(record), false) => queries::delete_starred(conn, record.id).map(|_| ()),
                _ => Ok(()),
            })
            .await;
        self.surface(result)
    }

    pub async fn clear_starred(&self) -> DatabaseResult<usize> {
        let db = self.handle().await?;
        db.call(queries::clear_starred).await
    }

    pub async fn fetch_progress(&self) -> DatabaseResult<Vec<Progress>> {
        let db = self.handle().await?;
        let records = db.call(queries::list_progress).await?;
        Ok(records.into_iter().map(Progress::from).collect())
    }

    /// Progress of one debate, if a record exists.
    pub async fn fetch_progress_for(&self, debate_id: DebateId) -> DatabaseResult<Option<Progress>> {
        let db = self.handle().await?;
        let result = db
            .call(move |conn| queries::find_progress(conn, debate_id))
            .await
            .map(|record| record.map(Progress::from));
        self.surface(result)
    }

    /// Record `points` as seen for `debate_id`, creating the progress record on
    /// first use, and store `completed_percentage` alongside.
    pub async fn add_seen_points(
        &self,
        debate_id: DebateId,
        points: Vec<PointId>,
        completed_percentage: u8,
    ) -> DatabaseResult<usize> {
        let db = self.handle().await?;
        let result = db
            .call(move |conn| {
                let tx = conn.unchecked_transaction()?;
                let record = match queries::find_progress(&tx, debate_id)? {
                    Some(record) => record,
                    None => queries::insert_progress(&tx, debate_id)?,
                };
                let added =
                    queries::append_seen_points(&tx, record.id, &points, completed_percentage)?;
                tx.commit()?;
                Ok(added)
            })
            .await;
        self.surface(result)
    }

    pub async fn clear_progress(&self) -> DatabaseResult<usize> {
        let db = self.handle().await?;
        db.call(queries::clear_progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_config_and_utils::notify::RecordingNotifier;
    use tempfile::tempdir;

    fn open_store(dir: &tempfile::TempDir) -> (LocalStore, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let store = LocalStore::new(dir.path().join("agora.sqlite"), notifier.clone());
        (store, notifier)
    }

    #[tokio::test]
    async fn test_crud_requires_load() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir);

        assert!(matches!(store.fetch_starred().await, Err(DatabaseError::NotLoaded)));
        assert!(matches!(
            store.add_seen_points(1, vec![1], 50).await,
            Err(DatabaseError::NotLoaded)
        ));

        store.load_persistent_store().await.unwrap();
        store.load_persistent_store().await.unwrap();
        assert!(store.is_loaded().await);
        assert!(store.fetch_starred().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_starred_is_idempotent() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir);
        store.load_persistent_store().await.unwrap();

        store.set_starred(7, true).await.unwrap();
        store.set_starred(7, true).await.unwrap();
        store.set_starred(9, true).await.unwrap();
        assert_eq!(store.fetch_starred().await.unwrap(), vec![7, 9]);

        store.set_starred(7, false).await.unwrap();
        store.set_starred(7, false).await.unwrap();
        assert_eq!(store.fetch_starred().await.unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn test_starred_survives_rearm() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir);
        store.load_persistent_store().await.unwrap();
        store.set_starred(7, true).await.unwrap();

        store.rearm().await;
        assert!(!store.is_loaded().await);
        assert!(matches!(store.fetch_starred().await, Err(DatabaseError::NotLoaded)));

        let (reopened, _) = open_store(&dir);
        reopened.load_persistent_store().await.unwrap();
        assert_eq!(reopened.fetch_starred().await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_add_seen_points_creates_record_lazily() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir);
        store.load_persistent_store().await.unwrap();

        assert!(store.fetch_progress_for(3).await.unwrap().is_none());
        store.add_seen_points(3, vec![30], 25).await.unwrap();
        store.add_seen_points(3, vec![31, 30], 50).await.unwrap();

        let progress = store.fetch_progress_for(3).await.unwrap().unwrap();
        assert_eq!(progress.seen_points, vec![30, 31]);
        assert_eq!(progress.completed_percentage, 50);

        assert_eq!(store.clear_progress().await.unwrap(), 1);
        assert!(store.fetch_progress().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_rows_surface_corruption_banner() {
        let dir = tempdir().unwrap();
        let (store, notifier) = open_store(&dir);
        store.load_persistent_store().await.unwrap();

        let db = store.handle().await.unwrap();
        db.call(|conn| {
            queries::insert_starred(conn, 5)?;
            queries::insert_starred(conn, 5)?;
            Ok(())
        })
        .await
        .unwrap();

        let err = store.set_starred(5, false).await.unwrap_err();
        assert!(err.is_corrupted());
        assert_eq!(notifier.count_titled(DATA_CORRUPTED_TITLE), 1);
        assert_eq!(notifier.banners()[0].action_label, None);
    }
}
