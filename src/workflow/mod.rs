//! Write paths: video, category, user and subscriber mutations.
//!
//! Every mutation validates its input before touching the store and runs its invariant checks
//! and its write inside one transaction.

mod categories;
mod permission;
mod slug;
mod source_id;
mod subscriptions;
mod users;
mod videos;

pub use categories::CategoryInput;
pub use permission::can_mutate;
pub use slug::{slugify, unique_slug};
pub use source_id::extract_source_id;
pub use subscriptions::{is_valid_email, SubscribeOutcome};
pub use users::UserInput;
pub use videos::VideoInput;

use sqlx::SqlitePool;

use crate::email::SharedNotifier;

#[derive(Clone)]
pub struct ContentWorkflow {
    pub(crate) db: SqlitePool,
    pub(crate) notifier: SharedNotifier,
    pub(crate) public_base_url: String,
}

impl ContentWorkflow {
    pub fn new(db: SqlitePool, notifier: SharedNotifier, public_base_url: impl Into<String>) -> Self {
        Self {
            db,
            notifier,
            public_base_url: public_base_url.into(),
        }
    }
}

/// Trims optional form text; blank values become `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
