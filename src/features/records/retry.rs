use crate::shared::errors::{AppError, AppResult};
use log::{error, info, warn};
use std::future::Future;
use std::time::Duration;

/// 待機時間の伸ばし方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 試行回数に比例（1回目の失敗後 base、2回目の失敗後 base*2 ...）
    Linear,
    /// 毎回同じ
    Fixed,
}

/// リトライ方針
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大試行回数（初回を含む）
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// 書き込み用（既定: 3回、1秒・2秒待機）
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: Backoff::Linear,
        }
    }

    /// 読み込み用（既定: 2回、2秒待機）
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            backoff: Backoff::Fixed,
        }
    }

    /// `attempt` 回目（1始まり）の失敗後に待つ時間
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::Fixed => self.base_delay,
        }
    }
}

/// 一時的エラーのみを方針に従って再試行する
///
/// 一時的でないエラーは即座に返す。上限に達した場合は `RetryExhausted` に変換する。
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut action: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt: u32 = 1;

    loop {
        match action().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("リトライ後に成功: operation={operation}, attempts={attempt}");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "一時的エラー、リトライします: operation={operation}, attempt={attempt}/{}, delay={delay:?}, error={e}",
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_retryable() => {
                error!("リトライ上限到達: operation={operation}, total_attempts={attempt}");
                return Err(AppError::RetryExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last_error: e.to_string(),
                });
            }
            Err(e) => {
                if attempt > 1 {
                    error!("リトライ中に致命的エラー: operation={operation}, attempt={attempt}");
                }
                return Err(e);
            }
        }
    }
}
