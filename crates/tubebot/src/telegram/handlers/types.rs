//! Handler types and dependencies

use std::sync::Arc;

use teloxide::types::User;
use tubecore::{ChatUser, DownloadFlow};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub flow: Arc<DownloadFlow>,
    pub admin_ids: Arc<Vec<i64>>,
}

impl HandlerDeps {
    pub fn new(flow: Arc<DownloadFlow>, admin_ids: Vec<i64>) -> Self {
        Self {
            flow,
            admin_ids: Arc::new(admin_ids),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Converts a Telegram user into the flow's view of a user.
///
/// Messages without a sender (channel posts) map to id 0.
pub fn chat_user(user: Option<&User>) -> ChatUser {
    match user {
        Some(user) => ChatUser {
            id: i64::try_from(user.id.0).unwrap_or(0),
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
        },
        None => ChatUser::default(),
    }
}
