//! 配信中のライブチャットIDの解決
//!
//! チャンネルID → 配信中の動画ID → activeLiveChatId を順に取得する。
//! search.list はクォータ消費が大きいため、対応関係はキャッシュに保存する。

use std::path::Path;
use std::sync::Arc;

use super::{client::YouTubeClient, errors::YouTubeError, types::LiveStreamInfo};
use crate::cache::{JsonFileCache, KeyValueCache};

pub const CHANNEL_TO_VIDEO_CACHE: &str = "channelToVideoIDCache";
pub const VIDEO_TO_CHAT_CACHE: &str = "videoToChatIDCache";

pub struct LiveStreamResolver {
    client: YouTubeClient,
    channel_to_video: Arc<dyn KeyValueCache>,
    video_to_chat: Arc<dyn KeyValueCache>,
}

impl LiveStreamResolver {
    pub fn new(
        client: YouTubeClient,
        channel_to_video: Arc<dyn KeyValueCache>,
        video_to_chat: Arc<dyn KeyValueCache>,
    ) -> Self {
        Self {
            client,
            channel_to_video,
            video_to_chat,
        }
    }

    /// `cache_dir` のJSONファイルキャッシュを使って作成
    pub async fn open(client: YouTubeClient, cache_dir: impl AsRef<Path>) -> Self {
        let cache_dir = cache_dir.as_ref();
        let channel_to_video = JsonFileCache::open(cache_dir, CHANNEL_TO_VIDEO_CACHE).await;
        let video_to_chat = JsonFileCache::open(cache_dir, VIDEO_TO_CHAT_CACHE).await;
        Self::new(client, Arc::new(channel_to_video), Arc::new(video_to_chat))
    }

    /// 配信中のライブ情報を取得
    ///
    /// 動画IDが指定されていればそれを使い、なければチャンネルの配信中動画を検索する。
    /// 配信が見つからない場合は `Ok(None)`
    pub async fn resolve(
        &self,
        channel_id: Option<&str>,
        video_id: Option<&str>,
    ) -> Result<Option<LiveStreamInfo>, YouTubeError> {
        let video_id = match (video_id, channel_id) {
            (Some(video_id), _) => video_id.to_string(),
            (None, Some(channel_id)) => match self.video_id_for_channel(channel_id).await? {
                Some(video_id) => video_id,
                None => return Ok(None),
            },
            (None, None) => return Ok(None),
        };

        let Some(chat_id) = self.chat_id_for_video(&video_id).await? else {
            return Ok(None);
        };

        Ok(Some(LiveStreamInfo {
            channel_id: channel_id.map(str::to_string),
            chat_id,
            live_stream_id: video_id,
        }))
    }

    async fn video_id_for_channel(&self, channel_id: &str) -> Result<Option<String>, YouTubeError> {
        if let Some(video_id) = self.channel_to_video.get(channel_id).await {
            return Ok(Some(video_id));
        }

        match self.client.find_live_video_id(channel_id).await? {
            Some(video_id) => {
                if let Err(e) = self.channel_to_video.set(channel_id, video_id.clone()).await {
                    log::warn!("Failed to cache video ID for {}: {}", channel_id, e);
                }
                Ok(Some(video_id))
            }
            None => {
                if let Err(e) = self.channel_to_video.clear(channel_id).await {
                    log::warn!("Failed to clear cached video ID for {}: {}", channel_id, e);
                }
                Ok(None)
            }
        }
    }

    async fn chat_id_for_video(&self, video_id: &str) -> Result<Option<String>, YouTubeError> {
        if let Some(chat_id) = self.video_to_chat.get(video_id).await {
            return Ok(Some(chat_id));
        }

        match self.client.get_live_chat_id(video_id).await {
            Ok(chat_id) => {
                if let Err(e) = self.video_to_chat.set(video_id, chat_id.clone()).await {
                    log::warn!("Failed to cache chat ID for {}: {}", video_id, e);
                }
                Ok(Some(chat_id))
            }
            Err(YouTubeError::LiveChatNotFound) => {
                if let Err(e) = self.video_to_chat.clear(video_id).await {
                    log::warn!("Failed to clear cached chat ID for {}: {}", video_id, e);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    async fn resolver_for(server: &mockito::Server, dir: &Path) -> LiveStreamResolver {
        let client = YouTubeClient::with_base_url("test-key".to_string(), &server.url()).unwrap();
        LiveStreamResolver::open(client, dir).await
    }

    #[tokio::test]
    async fn test_resolve_from_channel_uses_cache() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("channelId".into(), "UCabc".into()))
            .with_status(200)
            .with_body(r#"{"items": [{"id": {"videoId": "live1"}}]}"#)
            .expect(1)
            .create_async()
            .await;
        let videos = server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "live1".into()))
            .with_status(200)
            .with_body(r#"{"items": [{"liveStreamingDetails": {"activeLiveChatId": "chat-1"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver_for(&server, dir.path()).await;

        let expected = LiveStreamInfo {
            channel_id: Some("UCabc".to_string()),
            chat_id: "chat-1".to_string(),
            live_stream_id: "live1".to_string(),
        };
        assert_eq!(
            resolver.resolve(Some("UCabc"), None).await.unwrap(),
            Some(expected.clone())
        );
        // 2回目はキャッシュから解決する
        assert_eq!(
            resolver.resolve(Some("UCabc"), None).await.unwrap(),
            Some(expected)
        );

        search.assert_async().await;
        videos.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_from_video_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": [{"liveStreamingDetails": {"activeLiveChatId": "chat-2"}}]}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver_for(&server, dir.path()).await;

        let info = resolver.resolve(None, Some("video2")).await.unwrap().unwrap();
        assert_eq!(info.chat_id, "chat-2");
        assert_eq!(info.live_stream_id, "video2");
        assert_eq!(info.channel_id, None);
    }

    #[tokio::test]
    async fn test_no_live_stream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver_for(&server, dir.path()).await;

        assert_eq!(resolver.resolve(Some("UCoffline"), None).await.unwrap(), None);
        assert_eq!(resolver.resolve(None, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ended_stream_clears_cached_chat() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": [{"liveStreamingDetails": {}}]}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = YouTubeClient::with_base_url("test-key".to_string(), &server.url()).unwrap();
        let video_to_chat = Arc::new(JsonFileCache::open(dir.path(), VIDEO_TO_CHAT_CACHE).await);
        let channel_to_video = Arc::new(JsonFileCache::open(dir.path(), CHANNEL_TO_VIDEO_CACHE).await);
        let resolver = LiveStreamResolver::new(client, channel_to_video, video_to_chat.clone());

        assert_eq!(resolver.resolve(None, Some("old")).await.unwrap(), None);
        assert_eq!(video_to_chat.get("old").await, None);
    }
}
