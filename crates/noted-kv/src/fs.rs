use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{KvError, KvResult};
use crate::traits::KvStore;

/// File extension of value files; anything else in the directory is ignored.
const VALUE_EXT: &str = "kv";

/// Header size: 4 bytes CRC32 of the payload.
const HEADER_SIZE: usize = 4;

/// Directory-backed key-value partition.
///
/// Each key is stored in its own file named after the hex-encoded key.
/// On-disk format of a value file:
/// ```text
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload]
/// ```
/// Writes go to a temporary file in the same directory which is synced and
/// then renamed over the target, so a crash leaves either the old value or
/// the new one. A value whose checksum does not match is reported as
/// [`KvError::Corrupt`].
#[derive(Debug, Clone)]
pub struct FsKv {
    dir: PathBuf,
}

impl FsKv {
    /// Open (or create) a partition rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> KvResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Directory holding this partition's files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{VALUE_EXT}", hex::encode(key.as_bytes())))
    }

    async fn write_value(&self, key: &str, value: Bytes, overwrite: bool) -> KvResult<()> {
        let dir = self.dir.clone();
        let path = self.path_for(key);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &key, &value, overwrite))
            .await
            .map_err(|e| KvError::Task(e.to_string()))?
    }
}

fn write_atomic(dir: &Path, path: &Path, key: &str, value: &[u8], overwrite: bool) -> KvResult<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    let crc = crc32fast::hash(value);
    tmp.write_all(&crc.to_le_bytes())?;
    tmp.write_all(value)?;
    tmp.as_file().sync_all()?;

    if overwrite {
        tmp.persist(path).map_err(|e| KvError::Io(e.error))?;
    } else {
        tmp.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                KvError::AlreadyExists(key.to_string())
            } else {
                KvError::Io(e.error)
            }
        })?;
    }

    debug!(key, len = value.len(), "kv value written");
    Ok(())
}

fn decode_key(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(VALUE_EXT)?.strip_suffix('.')?;
    let raw = hex::decode(stem).ok()?;
    String::from_utf8(raw).ok()
}

#[async_trait]
impl KvStore for FsKv {
    async fn get(&self, key: &str) -> KvResult<Option<Bytes>> {
        let data = match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if data.len() < HEADER_SIZE {
            return Err(KvError::Corrupt {
                key: key.to_string(),
                reason: format!("value file is {} bytes, shorter than its header", data.len()),
            });
        }

        let expected = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let mut data = Bytes::from(data);
        let payload = data.split_off(HEADER_SIZE);
        let actual = crc32fast::hash(&payload);
        if actual != expected {
            warn!(key, expected, actual, "CRC mismatch on kv value");
            return Err(KvError::Corrupt {
                key: key.to_string(),
                reason: format!("CRC mismatch: expected {expected:#010x}, got {actual:#010x}"),
            });
        }
        Ok(Some(payload))
    }

    async fn set(&self, key: &str, value: Bytes) -> KvResult<()> {
        self.write_value(key, value, true).await
    }

    async fn add(&self, key: &str, value: Bytes) -> KvResult<()> {
        self.write_value(key, value, false).await
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> KvResult<()> {
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        let mut removed = 0usize;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            if name.to_str().and_then(decode_key).is_some() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        debug!(dir = %self.dir.display(), removed, "kv partition cleared");
        Ok(())
    }

    async fn keys(&self) -> KvResult<Vec<String>> {
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if let Some(key) = entry.file_name().to_str().and_then(decode_key) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn contains(&self, key: &str) -> KvResult<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_temp() -> (tempfile::TempDir, FsKv) {
        let dir = tempfile::tempdir().unwrap();
        let kv = FsKv::open(dir.path().join("logs")).await.unwrap();
        (dir, kv)
    }

    #[tokio::test]
    async fn set_get_roundtrip() {
        let (_dir, kv) = open_temp().await;
        kv.set("log:0", Bytes::from_static(b"[[1,2,\"a\"]]")).await.unwrap();
        let value = kv.get("log:0").await.unwrap().unwrap();
        assert_eq!(value, Bytes::from_static(b"[[1,2,\"a\"]]"));
    }

    #[tokio::test]
    async fn empty_value_roundtrip() {
        let (_dir, kv) = open_temp().await;
        kv.set("empty", Bytes::new()).await.unwrap();
        assert_eq!(kv.get("empty").await.unwrap(), Some(Bytes::new()));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let (_dir, kv) = open_temp().await;
        assert!(kv.get("nope").await.unwrap().is_none());
        assert!(!kv.contains("nope").await.unwrap());
    }

    #[tokio::test]
    async fn add_does_not_clobber() {
        let (_dir, kv) = open_temp().await;
        kv.add("abc123-xyz0", Bytes::from_static(b"first")).await.unwrap();
        let err = kv
            .add("abc123-xyz0", Bytes::from_static(b"second"))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(kv.get("abc123-xyz0").await.unwrap().unwrap(), "first");
    }

    #[tokio::test]
    async fn keys_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content");
        {
            let kv = FsKv::open(&path).await.unwrap();
            kv.set("b", Bytes::from_static(b"2")).await.unwrap();
            kv.set("a", Bytes::from_static(b"1")).await.unwrap();
        }
        let kv = FsKv::open(&path).await.unwrap();
        assert_eq!(kv.keys().await.unwrap(), vec!["a", "b"]);
        assert_eq!(kv.get("a").await.unwrap().unwrap(), "1");
    }

    #[tokio::test]
    async fn keys_ignore_foreign_files() {
        let (_dir, kv) = open_temp().await;
        kv.set("k", Bytes::from_static(b"v")).await.unwrap();
        tokio::fs::write(kv.dir().join("README"), b"not a value").await.unwrap();
        assert_eq!(kv.keys().await.unwrap(), vec!["k"]);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let (_dir, kv) = open_temp().await;
        kv.set("a", Bytes::from_static(b"1")).await.unwrap();
        kv.set("b", Bytes::from_static(b"2")).await.unwrap();
        assert!(kv.delete("a").await.unwrap());
        assert!(!kv.delete("a").await.unwrap());
        kv.clear().await.unwrap();
        assert!(kv.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn crc_detects_corruption() {
        let (_dir, kv) = open_temp().await;
        kv.set("log:3", Bytes::from_static(b"payload")).await.unwrap();

        let path = kv.path_for("log:3");
        let mut raw = tokio::fs::read(&path).await.unwrap();
        raw[HEADER_SIZE] ^= 0xFF;
        tokio::fs::write(&path, &raw).await.unwrap();

        let err = kv.get("log:3").await.unwrap_err();
        assert!(matches!(err, KvError::Corrupt { ref key, .. } if key == "log:3"));
    }

    #[tokio::test]
    async fn truncated_file_is_corrupt() {
        let (_dir, kv) = open_temp().await;
        tokio::fs::write(kv.path_for("short"), b"ab").await.unwrap();
        assert!(matches!(
            kv.get("short").await.unwrap_err(),
            KvError::Corrupt { .. }
        ));
    }

    #[test]
    fn decode_key_roundtrip() {
        let name = format!("{}.{VALUE_EXT}", hex::encode("log:12"));
        assert_eq!(decode_key(&name).as_deref(), Some("log:12"));
        assert_eq!(decode_key(".tmpA1b2C3"), None);
        assert_eq!(decode_key("zz.kv"), None);
    }
}
