use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{errors::YouTubeError, poller::ChatPageFetcher, types::*};
use crate::config::{http_timeout, CHAT_PAGE_SIZE, SOURCE_PROFILE_PIC_SIZE};
use crate::util::mask_api_key;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube Data API v3 クライアント
#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    /// # Errors
    /// HTTPクライアントのビルドに失敗した場合にエラーを返す
    pub fn new(api_key: String) -> Result<Self, YouTubeError> {
        Self::with_base_url(api_key, API_BASE)
    }

    /// 接続先を指定して作成（テスト用のモックサーバーなど）
    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, YouTubeError> {
        let client = Client::builder().timeout(http_timeout()).build()?;
        log::debug!(
            "YouTube client created for {} (key: {})",
            base_url,
            mask_api_key(&api_key)
        );
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 動画IDからactiveLiveChatIdを取得
    pub async fn get_live_chat_id(&self, video_id: &str) -> Result<String, YouTubeError> {
        log::info!(
            "Fetching live chat ID for video: {} (quota cost: 1 unit)",
            video_id
        );

        let url = format!("{}/videos", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "liveStreamingDetails"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => YouTubeError::VideoNotFound,
                _ => error_from_response(status, &body),
            });
        }

        let data: VideoResponse = response.json().await?;

        let chat_id = data
            .items
            .first()
            .and_then(|item| item.live_streaming_details.as_ref())
            .and_then(|details| details.active_live_chat_id.clone())
            .ok_or(YouTubeError::LiveChatNotFound)?;

        log::info!("Live chat ID retrieved: {}", chat_id);
        Ok(chat_id)
    }

    /// チャンネルで配信中の動画IDを検索（search.listでクォータ100消費）
    ///
    /// 配信中の動画がなければ `Ok(None)`
    pub async fn find_live_video_id(&self, channel_id: &str) -> Result<Option<String>, YouTubeError> {
        log::info!(
            "Searching live video for channel: {} (quota cost: 100 units)",
            channel_id
        );

        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("eventType", "live"),
                ("part", "id"),
                ("channelId", channel_id),
                ("type", "video"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        let data: SearchResponse = response.json().await?;
        let video_id = data.items.into_iter().find_map(|item| item.id.video_id);

        match &video_id {
            Some(id) => log::info!("Live video found for channel {}: {}", channel_id, id),
            None => log::info!("No live video for channel {}", channel_id),
        }
        Ok(video_id)
    }

    /// ライブチャットメッセージ取得
    pub async fn get_live_chat_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError> {
        log::debug!(
            "Fetching live chat messages for chat ID: {} (quota cost: ~5 units)",
            live_chat_id
        );

        let url = format!("{}/liveChat/messages", self.base_url);
        let max_results = CHAT_PAGE_SIZE.to_string();
        let pic_size = SOURCE_PROFILE_PIC_SIZE.to_string();

        let mut query_params = vec![
            ("liveChatId", live_chat_id),
            ("part", "id,snippet,authorDetails"),
            ("maxResults", max_results.as_str()),
            ("profileImageSize", pic_size.as_str()),
            ("key", self.api_key.as_str()),
        ];

        // pageTokenがある場合は追加
        if let Some(token) = page_token {
            query_params.push(("pageToken", token));
            log::debug!("Using page token: {}", token);
        }

        let response = self.client.get(&url).query(&query_params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            log::error!("YouTube API error - status: {}, body: {}", status, body);
            return Err(match status {
                StatusCode::NOT_FOUND => YouTubeError::LiveChatNotFound,
                _ => error_from_response(status, &body),
            });
        }

        if body.trim().is_empty() {
            return Err(YouTubeError::ParseError(
                "no result object was given".to_string(),
            ));
        }

        let data: LiveChatMessagesResponse = serde_json::from_str(&body)
            .map_err(|e| YouTubeError::ParseError(e.to_string()))?;

        log::debug!(
            "Fetched {} messages (polling interval: {}ms)",
            data.items.len(),
            data.polling_interval_millis
        );
        Ok(data)
    }
}

#[async_trait]
impl ChatPageFetcher for YouTubeClient {
    async fn fetch_page(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError> {
        self.get_live_chat_messages(live_chat_id, page_token).await
    }
}

/// エラーレスポンスを分類する
///
/// クォータ・レート制限は上流の `{code, message}` を保持する
fn error_from_response(status: StatusCode, body: &str) -> YouTubeError {
    let parsed = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .map(|resp| resp.error);
    let upstream = |fallback: &str| {
        parsed.clone().unwrap_or_else(|| ApiErrorObject {
            code: status.as_u16() as i64,
            message: fallback.to_string(),
        })
    };

    if body.contains("quotaExceeded") {
        log::error!("Quota exceeded - daily limit reached");
        let ApiErrorObject { code, message } = upstream("Quota exceeded");
        return YouTubeError::QuotaExceeded { code, message };
    }
    if body.contains("rateLimitExceeded") {
        log::warn!("Rate limit exceeded");
        let ApiErrorObject { code, message } = upstream("Rate limit exceeded");
        return YouTubeError::RateLimitExceeded { code, message };
    }
    if body.contains("liveChatDisabled") {
        return YouTubeError::LiveChatDisabled;
    }
    if body.contains("keyInvalid") || status == StatusCode::UNAUTHORIZED {
        return YouTubeError::InvalidApiKey;
    }

    match parsed {
        Some(error) => YouTubeError::Api {
            code: error.code,
            message: error.message,
        },
        None => YouTubeError::Api {
            code: status.as_u16() as i64,
            message: format!("Unexpected status: {} - {}", status, body),
        },
    }
}
