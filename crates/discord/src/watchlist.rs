use std::{collections::BTreeSet, path::PathBuf, sync::Arc};

use {
    tokio::sync::RwLock,
    tracing::{debug, info},
};

use crate::error::Result;

/// Set of channel ids whose messages reach the overlay.
///
/// Changes are written back to the config file (when one is known) before
/// the in-memory set is updated, so a failed write leaves both unchanged.
/// The write runs on the blocking pool; the set stays locked until it ends.
#[derive(Debug, Clone)]
pub struct WatchList {
    ids: Arc<RwLock<BTreeSet<u64>>>,
    config_path: Option<PathBuf>,
}

impl WatchList {
    pub fn new(ids: impl IntoIterator<Item = u64>, config_path: Option<PathBuf>) -> Self {
        Self {
            ids: Arc::new(RwLock::new(ids.into_iter().filter(|id| *id != 0).collect())),
            config_path,
        }
    }

    pub async fn contains(&self, id: u64) -> bool {
        self.ids.read().await.contains(&id)
    }

    pub async fn ids(&self) -> Vec<u64> {
        self.ids.read().await.iter().copied().collect()
    }

    /// Returns `false` if the channel was already watched.
    pub async fn add(&self, id: u64) -> Result<bool> {
        let mut ids = self.ids.write().await;
        if id == 0 || ids.contains(&id) {
            return Ok(false);
        }
        let mut next = ids.clone();
        next.insert(id);
        self.persist(&next).await?;
        *ids = next;
        info!(channel_id = id, watched = ids.len(), "channel added to watch list");
        Ok(true)
    }

    /// Returns `false` if the channel was not watched.
    pub async fn remove(&self, id: u64) -> Result<bool> {
        let mut ids = self.ids.write().await;
        if !ids.contains(&id) {
            return Ok(false);
        }
        let mut next = ids.clone();
        next.remove(&id);
        self.persist(&next).await?;
        *ids = next;
        info!(channel_id = id, watched = ids.len(), "channel removed from watch list");
        Ok(true)
    }

    async fn persist(&self, ids: &BTreeSet<u64>) -> Result<()> {
        let Some(path) = self.config_path.clone() else {
            debug!("no config file, watch list change kept in memory");
            return Ok(());
        };
        let list: Vec<u64> = ids.iter().copied().collect();
        tokio::task::spawn_blocking(move || chatcast_config::save_watch_channels(&path, &list))
            .await??;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_and_remove_report_changes() {
        let list = WatchList::new([3, 1], None);
        assert!(list.add(2).await.unwrap());
        assert!(!list.add(2).await.unwrap());
        assert_eq!(list.ids().await, vec![1, 2, 3]);

        assert!(list.remove(1).await.unwrap());
        assert!(!list.remove(1).await.unwrap());
        assert!(!list.contains(1).await);
        assert!(list.contains(3).await);
    }

    #[tokio::test]
    async fn zero_ids_are_never_watched() {
        let list = WatchList::new([0, 5], None);
        assert_eq!(list.ids().await, vec![5]);
        assert!(!list.add(0).await.unwrap());
    }

    #[tokio::test]
    async fn changes_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcast.toml");
        std::fs::write(&path, "[discord]\nwatch_channels = [10]\n").unwrap();

        let list = WatchList::new([10], Some(path.clone()));
        list.add(20).await.unwrap();
        list.remove(10).await.unwrap();

        let cfg = chatcast_config::load_config(&path).unwrap();
        assert_eq!(cfg.discord.watch_channels, vec![20]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_changes_are_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcast.toml");
        std::fs::write(&path, "[discord]\nwatch_channels = []\n").unwrap();

        let list = WatchList::new([], Some(path.clone()));
        let adds: Vec<_> = (1..=8u64)
            .map(|id| {
                let list = list.clone();
                tokio::spawn(async move { list.add(id).await.unwrap() })
            })
            .collect();
        for add in adds {
            assert!(add.await.unwrap());
        }

        let cfg = chatcast_config::load_config(&path).unwrap();
        assert_eq!(cfg.discord.watch_channels, (1..=8).collect::<Vec<u64>>());
        assert_eq!(list.ids().await, cfg.discord.watch_channels);
    }

    #[tokio::test]
    async fn failed_write_leaves_list_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcast.ini");

        let list = WatchList::new([1], Some(path));
        assert!(list.add(2).await.is_err());
        assert_eq!(list.ids().await, vec![1]);
    }
}
