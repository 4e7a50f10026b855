use chrono::{DateTime, Duration, Utc};

use crate::auth::Actor;
use crate::db::Video;
use crate::errors::AppError;

/// How long an uploader may change their own video after adding it.
pub fn edit_window() -> Duration {
    Duration::hours(48)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeniedReason {
    NotOwner,
    WindowExpired,
}

impl DeniedReason {
    pub fn message(&self) -> &'static str {
        match self {
            DeniedReason::NotOwner => "You cannot change a video uploaded by someone else.",
            DeniedReason::WindowExpired => {
                "You can no longer change this video (48 hours passed)."
            }
        }
    }
}

impl From<DeniedReason> for AppError {
    fn from(reason: DeniedReason) -> Self {
        AppError::Permission(reason.message().to_string())
    }
}

/// Shared by edit and delete: admins always pass, uploaders only on their own video within
/// the edit window.
pub fn can_mutate(video: &Video, actor: &Actor, now: DateTime<Utc>) -> Result<(), DeniedReason> {
    if actor.is_admin() {
        return Ok(());
    }
    if video.uploaded_by != Some(actor.user_id) {
        return Err(DeniedReason::NotOwner);
    }
    if now > video.date_added + edit_window() {
        return Err(DeniedReason::WindowExpired);
    }
    Ok(())
}
