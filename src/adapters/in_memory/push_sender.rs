//! Recording push sender for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::PushSender;

#[derive(Default)]
struct State {
    sent: Vec<(String, String)>,
    fail_all: bool,
}

/// Records every push instead of delivering it; can be told to fail.
#[derive(Default)]
pub struct RecordingPushSender {
    state: Mutex<State>,
}

impl RecordingPushSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(token, title)` pairs in send order.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().await.sent.clone()
    }

    /// Makes every subsequent send fail.
    pub async fn fail_all(&self) {
        self.state.lock().await.fail_all = true;
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send(
        &self,
        token: &str,
        title: &str,
        _body: &str,
        _payload: &serde_json::Value,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.fail_all {
            return Err(DomainError::new(
                crate::domain::foundation::ErrorCode::InternalError,
                "simulated push failure",
            ));
        }
        state.sent.push((token.to_string(), title.to_string()));
        Ok(())
    }
}
