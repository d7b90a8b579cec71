use thiserror::Error;

use super::types::ApiErrorObject;

#[derive(Error, Debug)]
pub enum YouTubeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API key is invalid or missing")]
    InvalidApiKey,

    #[error("Video not found or not a live stream")]
    VideoNotFound,

    #[error("Live chat not found or disabled")]
    LiveChatNotFound,

    #[error("Live chat is disabled for this video")]
    LiveChatDisabled,

    #[error("Quota exceeded - please try again tomorrow: {message}")]
    QuotaExceeded { code: i64, message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded { code: i64, message: String },

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl YouTubeError {
    /// HTTPステータス相当のコード（不明な場合は0）
    pub fn code(&self) -> i64 {
        match self {
            YouTubeError::HttpError(e) => e.status().map(|s| s.as_u16() as i64).unwrap_or(0),
            YouTubeError::InvalidApiKey => 401,
            YouTubeError::VideoNotFound | YouTubeError::LiveChatNotFound => 404,
            YouTubeError::LiveChatDisabled => 403,
            YouTubeError::QuotaExceeded { code, .. }
            | YouTubeError::RateLimitExceeded { code, .. }
            | YouTubeError::Api { code, .. } => *code,
            YouTubeError::ParseError(_) => 0,
        }
    }
}

impl From<YouTubeError> for ApiErrorObject {
    fn from(err: YouTubeError) -> Self {
        match err {
            // 上流のエラー内容をそのまま渡す
            YouTubeError::Api { code, message }
            | YouTubeError::QuotaExceeded { code, message }
            | YouTubeError::RateLimitExceeded { code, message } => ApiErrorObject { code, message },
            other => ApiErrorObject {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

impl From<YouTubeError> for String {
    fn from(err: YouTubeError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_passes_through() {
        let obj: ApiErrorObject = YouTubeError::Api {
            code: 403,
            message: "liveChatEnded".to_string(),
        }
        .into();
        assert_eq!(
            obj,
            ApiErrorObject {
                code: 403,
                message: "liveChatEnded".to_string()
            }
        );
    }

    #[test]
    fn test_parse_error_has_zero_code() {
        let obj: ApiErrorObject = YouTubeError::ParseError("empty body".to_string()).into();
        assert_eq!(obj.code, 0);
        assert!(obj.message.contains("empty body"));
    }

    #[test]
    fn test_quota_exceeded_keeps_upstream_message() {
        let err = YouTubeError::QuotaExceeded {
            code: 403,
            message: "The request cannot be completed because you have exceeded your quota."
                .to_string(),
        };
        assert_eq!(err.code(), 403);
        assert_eq!(YouTubeError::LiveChatNotFound.code(), 404);

        let obj: ApiErrorObject = err.into();
        assert_eq!(
            obj,
            ApiErrorObject {
                code: 403,
                message: "The request cannot be completed because you have exceeded your quota."
                    .to_string(),
            }
        );
    }
}
