use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmojiError {
    #[error("too much load - fetch queue is full ({limit} entries)")]
    QueueFull { limit: usize },

    #[error("invalid channel ID: {0}")]
    InvalidChannelId(String),

    #[error("scrape failed: {0}")]
    Scrape(String),

    #[error("emoji file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("emoji data serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<EmojiError> for String {
    fn from(err: EmojiError) -> String {
        err.to_string()
    }
}
