use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{KvError, KvResult};
use crate::fs::FsKv;
use crate::memory::InMemoryKv;
use crate::traits::KvStore;

/// A named database made of independent key-value partitions.
///
/// Partitions are fixed when the database is opened; asking for any other
/// name is an error rather than an implicit create.
#[derive(Clone)]
pub struct KvDatabase {
    name: String,
    partitions: BTreeMap<String, Arc<dyn KvStore>>,
}

impl KvDatabase {
    /// Create a database whose partitions live in memory.
    pub fn in_memory(name: impl Into<String>, partitions: &[&str]) -> Self {
        let partitions = partitions
            .iter()
            .map(|p| (p.to_string(), Arc::new(InMemoryKv::new()) as Arc<dyn KvStore>))
            .collect();
        Self {
            name: name.into(),
            partitions,
        }
    }

    /// Open (or create) a file-backed database at `root/<name>/<partition>`.
    pub async fn open_dir(root: &Path, name: impl Into<String>, partitions: &[&str]) -> KvResult<Self> {
        let name = name.into();
        let base = root.join(&name);
        let mut opened = BTreeMap::new();
        for partition in partitions {
            let kv = FsKv::open(base.join(partition)).await?;
            opened.insert(partition.to_string(), Arc::new(kv) as Arc<dyn KvStore>);
        }
        debug!(db = %name, dir = %base.display(), partitions = opened.len(), "kv database opened");
        Ok(Self {
            name,
            partitions: opened,
        })
    }

    /// Build a database from caller-supplied partition stores.
    pub fn from_partitions(
        name: impl Into<String>,
        partitions: impl IntoIterator<Item = (String, Arc<dyn KvStore>)>,
    ) -> Self {
        Self {
            name: name.into(),
            partitions: partitions.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to the named partition.
    pub fn partition(&self, name: &str) -> KvResult<Arc<dyn KvStore>> {
        self.partitions
            .get(name)
            .cloned()
            .ok_or_else(|| KvError::UnknownPartition(name.to_string()))
    }

    pub fn partition_names(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for KvDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvDatabase")
            .field("name", &self.name)
            .field("partitions", &self.partitions.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn partitions_are_independent() {
        let db = KvDatabase::in_memory("noted-local", &["content", "logs"]);
        let content = db.partition("content").unwrap();
        let logs = db.partition("logs").unwrap();

        content.set("k", Bytes::from_static(b"blob")).await.unwrap();
        assert!(logs.get("k").await.unwrap().is_none());
        assert_eq!(db.partition_names().collect::<Vec<_>>(), vec!["content", "logs"]);
    }

    #[tokio::test]
    async fn same_partition_handle_shares_state() {
        let db = KvDatabase::in_memory("db", &["logs"]);
        db.partition("logs")
            .unwrap()
            .set("log:0", Bytes::from_static(b"[]"))
            .await
            .unwrap();
        assert!(db.partition("logs").unwrap().contains("log:0").await.unwrap());
    }

    #[test]
    fn unknown_partition_is_an_error() {
        let db = KvDatabase::in_memory("db", &["logs"]);
        assert!(matches!(
            db.partition("content"),
            Err(KvError::UnknownPartition(p)) if p == "content"
        ));
    }

    #[tokio::test]
    async fn open_dir_lays_out_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let db = KvDatabase::open_dir(dir.path(), "noted-remote", &["content-cache", "logs-cache"])
            .await
            .unwrap();
        assert_eq!(db.name(), "noted-remote");
        assert!(dir.path().join("noted-remote").join("logs-cache").is_dir());

        db.partition("logs-cache")
            .unwrap()
            .set("log:0", Bytes::from_static(b"[]"))
            .await
            .unwrap();
        let reopened = KvDatabase::open_dir(dir.path(), "noted-remote", &["logs-cache"])
            .await
            .unwrap();
        assert_eq!(
            reopened.partition("logs-cache").unwrap().keys().await.unwrap(),
            vec!["log:0"]
        );
    }
}
