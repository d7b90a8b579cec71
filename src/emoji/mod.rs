//! チャンネルのカスタム絵文字（メンバースタンプ）モジュール
//!
//! 公式APIでは取得できないメンバースタンプを、動画ページのスクレイピング結果から
//! チャンネル単位のJSONファイルとして保存する。
//!
//! ## 構成
//! - `EmojiScraper`: 動画IDから絵文字一覧と正式なチャンネルIDを取得する（外部実装）
//! - `EmojiStore`: チャンネル単位の保存先
//! - `FetchQueue`: スクレイピング要求を直列化し、要求元すべてに結果を通知する

pub mod errors;
pub mod fetch_queue;
pub mod store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use errors::EmojiError;
pub use fetch_queue::{FetchQueue, FetchTicket, QueueEntry};
pub use store::JsonEmojiStore;

/// ショートコード（例: `:_hello:`）→ 画像URL
pub type CustomEmojis = BTreeMap<String, String>;

/// スクレイピング結果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedEmojis {
    pub emojis: CustomEmojis,
    /// ページから解決したチャンネルID（要求時のIDより優先する）
    pub channel_id: String,
}

/// 動画IDからカスタム絵文字を取得する
///
/// 絵文字が見つからない場合は `Ok(None)` を返す。
#[async_trait]
pub trait EmojiScraper: Send + Sync {
    async fn fetch_emojis(&self, video_id: &str) -> Result<Option<ScrapedEmojis>, EmojiError>;
}

/// チャンネル単位の絵文字データ保存先
#[async_trait]
pub trait EmojiStore: Send + Sync {
    /// チャンネルのデータが保存済みか
    async fn exists(&self, channel_id: &str) -> bool;

    /// チャンネルのデータを保存
    async fn persist(&self, channel_id: &str, emojis: &CustomEmojis) -> Result<(), EmojiError>;
}
