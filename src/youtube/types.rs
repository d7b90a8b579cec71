use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 配信終了時にチャットへ流れるイベント種別
pub const CHAT_ENDED_EVENT: &str = "chatEndedEvent";

// YouTube API レスポンス型

/// liveChatMessages.list のレスポンス（1ページ分）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessagesResponse {
    /// 次のリクエストまでの推奨間隔
    #[serde(default)]
    pub polling_interval_millis: u64,
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<LiveChatMessage>,
    /// 配信がオフラインになった時刻
    pub offline_at: Option<String>,
    pub error: Option<ApiErrorObject>,
}

impl LiveChatMessagesResponse {
    /// 配信がオフラインになっているか
    pub fn is_offline(&self) -> bool {
        self.offline_at.is_some()
    }

    pub fn offline_at(&self) -> Option<DateTime<Utc>> {
        self.offline_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// APIのエラーオブジェクト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorObject {
    pub code: i64,
    pub message: String,
}

/// APIのエラーレスポンス（`{"error": {...}}`）
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessage {
    pub id: String,
    pub snippet: MessageSnippet,
    #[serde(default)]
    pub author_details: AuthorDetails,
}

impl LiveChatMessage {
    /// 配信終了イベントか
    pub fn is_chat_ended(&self) -> bool {
        self.snippet.message_type == CHAT_ENDED_EVENT
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.snippet.published_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnippet {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub published_at: String,
    /// 配信終了イベントなどでは存在しない
    #[serde(default)]
    pub display_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorDetails {
    pub channel_id: String,
    pub display_name: String,
    pub profile_image_url: String,
    pub is_verified: bool,
    pub is_chat_owner: bool,
    pub is_chat_sponsor: bool,
    pub is_chat_moderator: bool,
}

#[derive(Debug, Deserialize)]
pub struct VideoResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoItem {
    #[serde(rename = "liveStreamingDetails")]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
pub struct LiveStreamingDetails {
    #[serde(rename = "activeLiveChatId")]
    pub active_live_chat_id: Option<String>,
}

/// search.list のレスポンス
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchItemId,
}

#[derive(Debug, Deserialize)]
pub struct SearchItemId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

/// 配信中のライブ情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamInfo {
    pub channel_id: Option<String>,
    pub chat_id: String,
    pub live_stream_id: String,
}
