//! Session-derived caller identity and role guards.
//!
//! Handlers never read roles from ambient state: they receive a [`RequestContext`] (or one of
//! the guard extractors) resolved from the session for that request only.

use std::fmt;
use std::str::FromStr;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::errors::AppError;

pub const USER_ID_KEY: &str = "user_id";
pub const ROLE_KEY: &str = "role";

/// Session key marking that this caller already counted a view of `video_id`.
pub fn viewed_key(video_id: i64) -> String {
    format!("viewed_{}", video_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Uploader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Uploader => "uploader",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "uploader" => Ok(Role::Uploader),
            _ => Err(UnknownRole(value.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerRole {
    Anonymous,
    Uploader,
    Admin,
}

pub fn caller_role(actor: Option<&Actor>) -> CallerRole {
    match actor.map(|a| a.role) {
        None => CallerRole::Anonymous,
        Some(Role::Uploader) => CallerRole::Uploader,
        Some(Role::Admin) => CallerRole::Admin,
    }
}

pub fn require_admin(actor: Option<Actor>) -> Result<Actor, AppError> {
    match actor {
        Some(actor) if actor.role == Role::Admin => Ok(actor),
        _ => Err(AppError::Authentication("Admin access required.".to_string())),
    }
}

pub fn require_uploader_or_admin(actor: Option<Actor>) -> Result<Actor, AppError> {
    match actor {
        Some(actor) => Ok(actor),
        None => Err(AppError::Authentication("Login required.".to_string())),
    }
}

pub fn require_uploader(actor: Option<Actor>) -> Result<Actor, AppError> {
    match actor {
        Some(actor) if actor.role == Role::Uploader => Ok(actor),
        _ => Err(AppError::Authentication("Uploader login required.".to_string())),
    }
}

#[tracing::instrument(name = "Resolve session actor", skip(session))]
pub async fn actor_from_session(session: &Session) -> Result<Option<Actor>, AppError> {
    let user_id: Option<i64> = session.get(USER_ID_KEY).await?;
    let role: Option<Role> = session.get(ROLE_KEY).await?;

    Ok(match (user_id, role) {
        (Some(user_id), Some(role)) => Some(Actor { user_id, role }),
        _ => None,
    })
}

/// Replaces whatever the session held with a fresh one bound to `actor`.
#[tracing::instrument(name = "Start authenticated session", skip(session))]
pub async fn start_session(session: &Session, actor: Actor) -> Result<(), AppError> {
    session.clear().await;
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, actor.user_id).await?;
    session.insert(ROLE_KEY, actor.role).await?;
    Ok(())
}

pub async fn end_session(session: &Session) -> Result<(), AppError> {
    session.flush().await?;
    Ok(())
}

/// Request-scoped context: the caller's session plus the identity resolved from it.
pub struct RequestContext {
    pub session: Session,
    pub actor: Option<Actor>,
}

async fn session_from_parts<S>(parts: &mut Parts, state: &S) -> Result<Session, AppError>
where
    S: Send + Sync,
{
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(status, msg)| {
            AppError::Unexpected(anyhow::anyhow!("session layer missing ({status}): {msg}"))
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;
        let actor = actor_from_session(&session).await?;
        Ok(RequestContext { session, actor })
    }
}

/// Rejects with 401 unless the session belongs to an admin.
pub struct RequireAdmin(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state).await?;
        Ok(RequireAdmin(require_admin(ctx.actor)?))
    }
}

/// Rejects with 401 unless the session belongs to an uploader or an admin.
pub struct RequireUploaderOrAdmin(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUploaderOrAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state).await?;
        Ok(RequireUploaderOrAdmin(require_uploader_or_admin(ctx.actor)?))
    }
}

pub struct RequireUploader(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUploader
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state).await?;
        Ok(RequireUploader(require_uploader(ctx.actor)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Actor = Actor { user_id: 1, role: Role::Admin };
    const UPLOADER: Actor = Actor { user_id: 2, role: Role::Uploader };

    #[test]
    fn parses_roles_case_insensitively() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("uploader".parse::<Role>().unwrap(), Role::Uploader);
        assert!("editor".parse::<Role>().is_err());
    }

    #[test]
    fn resolves_caller_role() {
        assert_eq!(caller_role(None), CallerRole::Anonymous);
        assert_eq!(caller_role(Some(&UPLOADER)), CallerRole::Uploader);
        assert_eq!(caller_role(Some(&ADMIN)), CallerRole::Admin);
    }

    #[test]
    fn admin_guard_only_admits_admins() {
        assert_eq!(require_admin(Some(ADMIN)).unwrap(), ADMIN);
        assert!(matches!(require_admin(Some(UPLOADER)), Err(AppError::Authentication(_))));
        assert!(matches!(require_admin(None), Err(AppError::Authentication(_))));
    }

    #[test]
    fn uploader_or_admin_guard_rejects_anonymous() {
        assert!(require_uploader_or_admin(Some(ADMIN)).is_ok());
        assert!(require_uploader_or_admin(Some(UPLOADER)).is_ok());
        assert!(matches!(
            require_uploader_or_admin(None),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn viewed_key_is_per_video() {
        assert_eq!(viewed_key(7), "viewed_7");
        assert_ne!(viewed_key(7), viewed_key(8));
    }
}
