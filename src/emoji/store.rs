//! チャンネル単位の絵文字JSONファイル保存

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{CustomEmojis, EmojiError, EmojiStore};

/// `<data_dir>/<channelID>.json` に絵文字データを保存するストア
#[derive(Debug, Clone)]
pub struct JsonEmojiStore {
    data_dir: PathBuf,
}

impl JsonEmojiStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// チャンネルの保存先パスを取得
    ///
    /// パス区切りや `..` を含むIDはディレクトリ外を指すため拒否する
    pub fn artifact_path(&self, channel_id: &str) -> Result<PathBuf, EmojiError> {
        if channel_id.is_empty()
            || channel_id.contains('/')
            || channel_id.contains('\\')
            || channel_id.contains("..")
        {
            return Err(EmojiError::InvalidChannelId(channel_id.to_string()));
        }
        Ok(self.data_dir.join(format!("{}.json", channel_id)))
    }

    /// 保存済みの絵文字データを読み込む（未保存ならNone）
    pub async fn load(&self, channel_id: &str) -> Result<Option<CustomEmojis>, EmojiError> {
        let path = self.artifact_path(channel_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl EmojiStore for JsonEmojiStore {
    async fn exists(&self, channel_id: &str) -> bool {
        match self.artifact_path(channel_id) {
            Ok(path) => tokio::fs::metadata(&path).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn persist(&self, channel_id: &str, emojis: &CustomEmojis) -> Result<(), EmojiError> {
        let path = self.artifact_path(channel_id)?;
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let json = serde_json::to_string(emojis)?;
        tokio::fs::write(&path, json).await?;
        log::info!("Wrote {} emojis to {}", emojis.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_emojis() -> CustomEmojis {
        let mut emojis = CustomEmojis::new();
        emojis.insert(
            ":_wave:".to_string(),
            "https://yt3.ggpht.com/wave=w48-h48".to_string(),
        );
        emojis
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        // 存在しないサブディレクトリも作成される
        let store = JsonEmojiStore::new(dir.path().join("data"));

        assert!(!store.exists("UCabc").await);
        store.persist("UCabc", &sample_emojis()).await.unwrap();
        assert!(store.exists("UCabc").await);

        let loaded = store.load("UCabc").await.unwrap().unwrap();
        assert_eq!(loaded, sample_emojis());
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonEmojiStore::new(dir.path());
        assert!(store.load("UCnothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonEmojiStore::new(dir.path());

        assert!(matches!(
            store.artifact_path("../etc/passwd"),
            Err(EmojiError::InvalidChannelId(_))
        ));
        assert!(!store.exists("a/b").await);
        assert!(store.persist("", &sample_emojis()).await.is_err());
    }

    #[test]
    fn test_artifact_path() {
        let store = JsonEmojiStore::new("/srv/data");
        assert_eq!(
            store.artifact_path("UC123").unwrap(),
            PathBuf::from("/srv/data/UC123.json")
        );
    }
}
