use serde::Serialize;
use std::time::Duration;

/// ポーリングセッションの状態遷移
///
/// `Starting → DeliveringFirstPage → Polling → DeliveringPage → Polling → …`
/// を繰り返し、`Stopped` / `Errored` / `Ended` のいずれかで終了する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Starting,
    DeliveringFirstPage,
    Polling,
    DeliveringPage,
    /// stop() による停止
    Stopped,
    /// エラーレスポンスによる停止
    Errored,
    /// 配信終了
    Ended,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Stopped | SessionState::Errored | SessionState::Ended
        )
    }
}

/// ポーリングセッションの内部状態
///
/// 停止後は再利用しない。再開する場合は新しいセッションを作成する。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSession {
    /// 現在のライブチャットID
    pub chat_id: String,
    /// 最初のページをまだ配信していないか
    pub first_run: bool,
    /// 次回リクエスト用のページトークン
    pub next_page_token: Option<String>,
    /// ページ取得回数
    pub poll_count: u64,
    pub state: SessionState,
}

impl PollSession {
    pub fn new(chat_id: String) -> Self {
        Self {
            chat_id,
            first_run: true,
            next_page_token: None,
            poll_count: 0,
            state: SessionState::Starting,
        }
    }

    /// ページ受信後に呼び出す
    ///
    /// 配信開始時の状態（最初のページかどうか）を返す
    pub fn on_page(&mut self, next_page_token: Option<String>) -> SessionState {
        self.poll_count += 1;
        self.next_page_token = next_page_token;

        self.state = if self.first_run {
            self.first_run = false;
            SessionState::DeliveringFirstPage
        } else {
            SessionState::DeliveringPage
        };
        self.state
    }

    pub fn transition(&mut self, state: SessionState) {
        if self.state != state {
            log::debug!(
                "Poll session {}: {:?} -> {:?}",
                self.chat_id,
                self.state,
                state
            );
        }
        self.state = state;
    }
}

/// 次のリクエストまでの待機時間
///
/// サーバー推奨間隔から配信に費やした時間を差し引く。ただし `min_request_delay` を下回らない。
///
/// `max(server_interval - elapsed_delivery, min_request_delay)`
pub fn next_poll_delay(
    server_interval: Duration,
    elapsed_delivery: Duration,
    min_request_delay: Duration,
) -> Duration {
    server_interval
        .saturating_sub(elapsed_delivery)
        .max(min_request_delay)
}
