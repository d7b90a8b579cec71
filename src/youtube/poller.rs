//! ライブチャットポーラー
//!
//! チャットページを繰り返し取得し、メッセージを1件ずつコールバックに渡す。
//!
//! ## 配信ペース
//! - 最初のページ（過去ログ）は待機なしで即座に配信する
//! - 2ページ目以降は `throttle::deliver_paced` で一定時間に分散して配信する
//! - 次のリクエストはサーバー推奨間隔から配信時間を差し引いて待機する（最小間隔あり）
//!
//! ## 停止
//! `stop()` はフラグを立てるだけで、取得中のリクエストは中断しない。
//! フラグはページ取得の前後・各メッセージの配信前・待機中に確認する。

use async_trait::async_trait;
use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::{
    errors::YouTubeError,
    state::{next_poll_delay, PollSession, SessionState},
    throttle::{deliver_paced, Pacing},
    types::{ApiErrorObject, LiveChatMessage, LiveChatMessagesResponse},
};
use crate::config::{PollerConfig, SOURCE_PROFILE_PIC_SIZE};
use crate::util::resize_profile_image_url;

/// チャットページの取得元
#[async_trait]
pub trait ChatPageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError>;
}

/// セッションの停止フラグ
///
/// クローンは同じフラグを共有する。一度立てたフラグは戻らない。
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 停止を要求（何度呼んでもよい）
    ///
    /// 停止はチェックポイント単位で反映される。別スレッドから呼んだ場合、
    /// チェックポイントを通過済みの取得・配信が1件だけ続くことがある。
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // このトークンで待機中のセッションをすべて起こす
        self.wake.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// `duration` 待機する。停止された場合は `true` を返す
    async fn sleep(&self, duration: Duration) -> bool {
        // フラグ確認より先に登録し、直後の stop() を取りこぼさない
        let notified = self.wake.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_stopped() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = notified => {}
        }
        self.is_stopped()
    }
}

/// セッションの終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PollOutcome {
    /// stop() による停止
    Stopped,
    /// エラーレスポンスによる停止（onErrorを呼び出し済み）
    Errored,
    /// 配信終了
    Ended,
}

impl From<PollOutcome> for SessionState {
    fn from(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Stopped => SessionState::Stopped,
            PollOutcome::Errored => SessionState::Errored,
            PollOutcome::Ended => SessionState::Ended,
        }
    }
}

/// 実行中のポーリングセッション
pub struct PollHandle {
    chat_id: String,
    stop: StopToken,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// ポーリングを停止
    ///
    /// 次の確認ポイント以降、メッセージ配信とページ取得は行われない
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// セッションが終了しているか
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// セッションの終了を待つ
    pub async fn join(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Poll session for {} panicked: {}", self.chat_id, e);
                PollOutcome::Errored
            }
        }
    }
}

/// ライブチャットポーラー
///
/// `start()` ごとに独立したセッションを起動する。セッション同士は状態を共有しない。
#[derive(Clone)]
pub struct ChatPoller {
    fetcher: Arc<dyn ChatPageFetcher>,
    config: PollerConfig,
}

impl ChatPoller {
    pub fn new(fetcher: Arc<dyn ChatPageFetcher>) -> Self {
        Self::with_config(fetcher, PollerConfig::default())
    }

    pub fn with_config(fetcher: Arc<dyn ChatPageFetcher>, config: PollerConfig) -> Self {
        Self { fetcher, config }
    }

    /// ポーリングを開始
    ///
    /// # 引数
    /// - `chat_id`: ライブチャットID
    /// - `on_message`: メッセージごとに到着順で呼ばれる
    /// - `on_error`: エラー発生時に最大1回呼ばれ、セッションは終了する
    pub fn start<M, E>(&self, chat_id: String, on_message: M, on_error: E) -> PollHandle
    where
        M: FnMut(LiveChatMessage) + Send + 'static,
        E: FnOnce(ApiErrorObject) + Send + 'static,
    {
        self.start_with_stop_token(chat_id, StopToken::new(), on_message, on_error)
    }

    /// 既存の停止フラグを使ってポーリングを開始
    pub fn start_with_stop_token<M, E>(
        &self,
        chat_id: String,
        stop: StopToken,
        on_message: M,
        on_error: E,
    ) -> PollHandle
    where
        M: FnMut(LiveChatMessage) + Send + 'static,
        E: FnOnce(ApiErrorObject) + Send + 'static,
    {
        let session = PollSession::new(chat_id.clone());
        let fetcher = Arc::clone(&self.fetcher);
        let config = self.config.clone();
        let token = stop.clone();

        let task = tokio::spawn(async move {
            run_session(fetcher, config, session, token, on_message, on_error).await
        });

        PollHandle {
            chat_id,
            stop,
            task,
        }
    }
}

/// 表示用にメッセージを加工
fn enrich(message: &mut LiveChatMessage, pic_size: u32) {
    let url = &message.author_details.profile_image_url;
    if !url.is_empty() {
        message.author_details.profile_image_url =
            resize_profile_image_url(url, SOURCE_PROFILE_PIC_SIZE, pic_size);
    }
}

/// ポーリングループ（内部実装）
async fn run_session<M, E>(
    fetcher: Arc<dyn ChatPageFetcher>,
    config: PollerConfig,
    mut session: PollSession,
    stop: StopToken,
    mut on_message: M,
    on_error: E,
) -> PollOutcome
where
    M: FnMut(LiveChatMessage),
    E: FnOnce(ApiErrorObject),
{
    let pacing = Pacing::from(&config);
    let mut on_error = Some(on_error);
    let mut report = |error: ApiErrorObject| {
        if let Some(callback) = on_error.take() {
            callback(error);
        }
    };

    log::info!("Polling started for chat {}", session.chat_id);

    let outcome = loop {
        if stop.is_stopped() {
            break PollOutcome::Stopped;
        }

        let result = fetcher
            .fetch_page(&session.chat_id, session.next_page_token.as_deref())
            .await;

        if stop.is_stopped() {
            break PollOutcome::Stopped;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::error!("Failed to fetch chat page for {}: {}", session.chat_id, e);
                report(e.into());
                break PollOutcome::Errored;
            }
        };

        let LiveChatMessagesResponse {
            polling_interval_millis,
            next_page_token,
            items,
            offline_at,
            error,
        } = page;

        if let Some(error) = error {
            log::error!(
                "Chat page error for {}: {} {}",
                session.chat_id,
                error.code,
                error.message
            );
            report(error);
            break PollOutcome::Errored;
        }

        log::debug!(
            "Chat {}: page {} with {} messages",
            session.chat_id,
            session.poll_count + 1,
            items.len()
        );

        let mut chat_ended = false;
        let mut deliver = |mut message: LiveChatMessage| {
            enrich(&mut message, config.profile_pic_size);
            if message.is_chat_ended() {
                chat_ended = true;
            }
            on_message(message);
        };

        let elapsed = match session.on_page(next_page_token) {
            SessionState::DeliveringFirstPage => {
                // 過去ログは待たずに配信
                for message in items {
                    if stop.is_stopped() {
                        break;
                    }
                    deliver(message);
                }
                Duration::ZERO
            }
            _ => {
                deliver_paced(items, pacing, |message| {
                    if stop.is_stopped() {
                        return ControlFlow::Break(());
                    }
                    deliver(message);
                    ControlFlow::Continue(())
                })
                .await
                .elapsed
            }
        };

        if stop.is_stopped() {
            break PollOutcome::Stopped;
        }
        if offline_at.is_some() || chat_ended {
            log::info!("Live chat {} has ended", session.chat_id);
            break PollOutcome::Ended;
        }

        session.transition(SessionState::Polling);

        let delay = next_poll_delay(
            Duration::from_millis(polling_interval_millis),
            elapsed,
            config.min_request_delay,
        );
        log::debug!(
            "Next poll for {} in {}ms (delivery took {}ms)",
            session.chat_id,
            delay.as_millis(),
            elapsed.as_millis()
        );

        if stop.sleep(delay).await {
            break PollOutcome::Stopped;
        }
    };

    session.transition(outcome.into());
    log::info!(
        "Polling ended for chat {} after {} pages: {:?}",
        session.chat_id,
        session.poll_count,
        outcome
    );
    outcome
}
