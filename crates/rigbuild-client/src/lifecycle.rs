use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::ApiError;

/// Cancellation scope tied to one view (selector or picker).
///
/// Clones share the token, so whoever navigates away can cancel a view
/// while one of its requests is still in flight. A result that arrives
/// after cancellation is reported as [`ApiError::Cancelled`] and never
/// applied.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    token: CancellationToken,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn guard<T>(
        &self,
        fut: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ApiError::Cancelled),
            res = fut => {
                if self.is_cancelled() {
                    Err(ApiError::Cancelled)
                } else {
                    res
                }
            }
        }
    }
}
