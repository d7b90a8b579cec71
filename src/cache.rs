// =============================================================================
// キー・バリューキャッシュ
// =============================================================================
// チャンネルID→動画ID、動画ID→チャットIDの対応をファイルに保存して
// YouTube Data API のクォータ消費を減らす
// =============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 文字列キー・文字列値のキャッシュ
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// キーに対応する値を取得（なければNone）
    async fn get(&self, key: &str) -> Option<String>;

    /// 値を保存
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// キーを削除
    async fn clear(&self, key: &str) -> Result<(), CacheError>;
}

/// 名前付きのJSONファイルキャッシュ
///
/// `<dir>/<name>.json` に1つのJSONオブジェクトとして保存する。
/// 読み込み時に壊れたファイルは空のキャッシュとして扱う。
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    name: String,
    path: PathBuf,
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl JsonFileCache {
    /// キャッシュファイルを開く（存在しなければ空で開始）
    pub async fn open(dir: impl AsRef<Path>, name: &str) -> Self {
        let path = dir.as_ref().join(format!("{}.json", name));
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("Discarding unreadable cache {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                log::warn!("Failed to read cache {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        log::debug!("Cache {} opened with {} entries", name, entries.len());

        Self {
            name: name.to_string(),
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// キャッシュ名
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn flush(&self, entries: &HashMap<String, String>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string(entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueCache for JsonFileCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let value = entries.get(key).cloned();
        if value.is_some() {
            log::debug!("Cache hit ({}): {}", self.name, key);
        } else {
            log::debug!("Cache miss ({}): {}", self.name, key);
        }
        value
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    async fn clear(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries).await
    }
}
