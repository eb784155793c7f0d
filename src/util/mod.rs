//! 공용 비동기 헬퍼

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{AdvisorError, AdvisorResult};

/// 취소 신호와 경합시켜 실행. 취소되면 `AdvisorError::Cancelled`
pub async fn cancellable<T, E, F>(cancel: &CancellationToken, fut: F) -> AdvisorResult<T>
where
    F: Future<Output = Result<T, E>>,
    AdvisorError: From<E>,
{
    if cancel.is_cancelled() {
        return Err(AdvisorError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AdvisorError::Cancelled),
        result = fut => result.map_err(AdvisorError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::StoreError;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let value = cancellable(&cancel, async { Ok::<_, StoreError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cancellable(&cancel, async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, StoreError>(())
        })
        .await;

        assert!(matches!(result, Err(AdvisorError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_during_wait() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = cancellable(&cancel, async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, StoreError>(())
        })
        .await;

        assert!(matches!(result, Err(AdvisorError::Cancelled)));
    }
}
