//! In-memory notification store with failure injection for fan-out tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, NotificationId, Timestamp};
use crate::domain::notification::{NewNotification, Notification};
use crate::ports::NotificationStore;

#[derive(Default)]
struct State {
    rows: Vec<Notification>,
    fail_next: bool,
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    state: Mutex<State>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    pub async fn all(&self) -> Vec<Notification> {
        self.state.lock().await.rows.clone()
    }

    /// Makes the next insert fail with a database error.
    pub async fn fail_next(&self) {
        self.state.lock().await.fail_next = true;
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: NewNotification) -> Result<Notification, DomainError> {
        let mut state = self.state.lock().await;
        if state.fail_next {
            state.fail_next = false;
            return Err(DomainError::database("simulated insert failure"));
        }
        let row = Notification {
            id: NotificationId::new(),
            tenant_id: notification.tenant_id,
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title,
            body: notification.body,
            payload: notification.payload,
            created_at: Timestamp::now(),
            read_at: None,
        };
        state.rows.push(row.clone());
        Ok(row)
    }
}
