// =============================================================================
// 共通設定・定数モジュール
// =============================================================================
// フェッチキュー・チャットポーラー・HTTPクライアントで使用する設定値を定義
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::emoji::JsonEmojiStore;

/// HTTPリクエストのデフォルトタイムアウト（秒）
///
/// YouTube Data API へのリクエストで使用。
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// フェッチキューの最大保持数
///
/// これ以上はキューに積まず即座に拒否する（"too much load"）。
pub const QUEUE_LIMIT: usize = 5000;

/// フェッチキューの処理間隔（ミリ秒）
///
/// スクレイピング先のレート制限を避けるため、1件処理するごとに必ず待機する。
pub const QUEUE_STEP_DELAY_MS: u64 = 1000;

/// 2ページ目以降のメッセージを配信しきる目標時間（ミリ秒）
pub const PACING_WINDOW_MS: u64 = 10_000;

/// 1メッセージあたりの最小配信間隔（ミリ秒）
pub const MIN_PER_ITEM_DELAY_MS: u64 = 256;

/// 次のリクエストまでの最小待機時間（ミリ秒）
pub const MIN_REQUEST_DELAY_MS: u64 = 2000;

/// 表示用のプロフィール画像サイズ（px）
pub const PROFILE_PIC_SIZE: u32 = 32;

/// API に要求するプロフィール画像サイズ（px）
pub const SOURCE_PROFILE_PIC_SIZE: u32 = 16;

/// liveChatMessages.list の maxResults
pub const CHAT_PAGE_SIZE: u32 = 512;

/// HTTPリクエストのデフォルトタイムアウト（Duration）
pub fn http_timeout() -> Duration {
    Duration::from_secs(HTTP_TIMEOUT_SECS)
}

/// フェッチキューの設定
#[derive(Debug, Clone)]
pub struct FetchQueueConfig {
    /// 最大保持数
    pub limit: usize,
    /// 1件ごとの待機時間
    pub step_delay: Duration,
}

impl Default for FetchQueueConfig {
    fn default() -> Self {
        Self {
            limit: QUEUE_LIMIT,
            step_delay: Duration::from_millis(QUEUE_STEP_DELAY_MS),
        }
    }
}

/// チャットポーラーの設定
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// 2ページ目以降を配信しきる目標時間
    pub pacing_window: Duration,
    /// 1メッセージあたりの最小配信間隔
    pub min_per_item_delay: Duration,
    /// 次のリクエストまでの最小待機時間
    pub min_request_delay: Duration,
    /// プロフィール画像の表示サイズ
    pub profile_pic_size: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            pacing_window: Duration::from_millis(PACING_WINDOW_MS),
            min_per_item_delay: Duration::from_millis(MIN_PER_ITEM_DELAY_MS),
            min_request_delay: Duration::from_millis(MIN_REQUEST_DELAY_MS),
            profile_pic_size: PROFILE_PIC_SIZE,
        }
    }
}

/// 環境変数から読み込むアプリケーション設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// YouTube Data API キー（YOUTUBE_API_KEY）
    pub api_key: String,
    /// 絵文字データの保存先（EMOJI_DATA_DIR、デフォルト ./data）
    pub data_dir: PathBuf,
    /// キャッシュファイルの保存先（CACHE_DIR）
    pub cache_dir: PathBuf,
    pub poller: PollerConfig,
}

/// 設定読み込みエラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

impl AppConfig {
    /// 環境変数（と .env）から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("YOUTUBE_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::Missing("YOUTUBE_API_KEY"))?;

        let data_dir = lookup("EMOJI_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let cache_dir = lookup("CACHE_DIR").map(PathBuf::from).unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("yt-emoji-chat")
        });

        let mut poller = PollerConfig::default();
        if let Some(value) = lookup("CHAT_PIC_SIZE") {
            poller.profile_pic_size = value.parse().map_err(|_| ConfigError::Invalid {
                name: "CHAT_PIC_SIZE",
                value,
            })?;
        }

        Ok(Self {
            api_key,
            data_dir,
            cache_dir,
            poller,
        })
    }

    /// `data_dir` を保存先とする絵文字ストア
    pub fn emoji_store(&self) -> JsonEmojiStore {
        JsonEmojiStore::new(self.data_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_http_timeout_duration() {
        assert_eq!(http_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_defaults() {
        let queue = FetchQueueConfig::default();
        assert_eq!(queue.limit, 5000);
        assert_eq!(queue.step_delay, Duration::from_secs(1));

        let poller = PollerConfig::default();
        assert_eq!(poller.pacing_window, Duration::from_secs(10));
        assert_eq!(poller.min_per_item_delay, Duration::from_millis(256));
        assert_eq!(poller.min_request_delay, Duration::from_secs(2));
        assert_eq!(poller.profile_pic_size, 32);
    }

    #[test]
    fn test_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("YOUTUBE_API_KEY", "AIzaTestKey123456"),
            ("EMOJI_DATA_DIR", "/tmp/emojis"),
            ("CACHE_DIR", "/tmp/cache"),
            ("CHAT_PIC_SIZE", "64"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "AIzaTestKey123456");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/emojis"));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(config.poller.profile_pic_size, 64);
    }

    #[test]
    fn test_missing_api_key() {
        let result = AppConfig::from_lookup(lookup_from(&[("YOUTUBE_API_KEY", "")]));
        assert!(matches!(result, Err(ConfigError::Missing("YOUTUBE_API_KEY"))));
    }

    #[test]
    fn test_invalid_pic_size() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("YOUTUBE_API_KEY", "key"),
            ("CHAT_PIC_SIZE", "large"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_default_data_dir() {
        let config = AppConfig::from_lookup(lookup_from(&[("YOUTUBE_API_KEY", "key")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_emoji_store_uses_data_dir() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("YOUTUBE_API_KEY", "key"),
            ("EMOJI_DATA_DIR", "/tmp/emojis"),
        ]))
        .unwrap();

        let store = config.emoji_store();
        assert_eq!(store.data_dir(), Path::new("/tmp/emojis"));
        assert_eq!(
            store.artifact_path("UCabc").unwrap(),
            PathBuf::from("/tmp/emojis/UCabc.json")
        );
    }
}
