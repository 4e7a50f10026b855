use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{is_valid_email, non_blank, ContentWorkflow};
use crate::auth::Role;
use crate::authentication::compute_password_hash;
use crate::config::AdminSeed;
use crate::db::{NewUser, User, UserRepo};
use crate::errors::AppError;

/// Account form submitted by an admin. There is no self-registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

impl ContentWorkflow {
    #[tracing::instrument(name = "Create user", skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: UserInput, now: DateTime<Utc>) -> Result<User, AppError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if username.is_empty() {
            return Err(AppError::Validation("Username is required.".to_string()));
        }
        if email.is_empty() {
            return Err(AppError::Validation("Email is required.".to_string()));
        }
        if !is_valid_email(&email) {
            return Err(AppError::Validation("Invalid email address.".to_string()));
        }
        if input.password.is_empty() {
            return Err(AppError::Validation("Password is required.".to_string()));
        }
        let role = match non_blank(input.role) {
            None => Role::Uploader,
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|e| AppError::Validation(format!("Invalid role: {}", e)))?,
        };

        let password_hash = compute_password_hash(&input.password)?;

        let mut transaction = self.db.begin().await?;
        let mut users = UserRepo::new(&mut transaction);

        if users.username_taken(&username).await? {
            return Err(AppError::Conflict("User already exists.".to_string()));
        }
        if users.email_taken(&email).await? {
            return Err(AppError::Conflict("Email already in use.".to_string()));
        }

        let user = users
            .insert(&NewUser {
                username,
                email,
                password_hash,
                role,
                created_at: now,
            })
            .await?;

        transaction.commit().await?;
        tracing::info!(user_id = user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Creates the configured admin account if the store has no admin yet.
    #[tracing::instrument(name = "Ensure admin account", skip(self, seed))]
    pub async fn ensure_admin(&self, seed: Option<&AdminSeed>, now: DateTime<Utc>) -> Result<Option<User>, AppError> {
        let mut conn = self.db.acquire().await?;
        if UserRepo::new(&mut conn).admin_exists().await? {
            tracing::info!("Admin user already exists.");
            return Ok(None);
        }
        drop(conn);

        let Some(seed) = seed else {
            tracing::warn!("No admin user exists and ADMIN_* settings are not set");
            return Ok(None);
        };

        let user = self
            .create_user(
                UserInput {
                    username: seed.username.clone(),
                    email: seed.email.clone(),
                    password: seed.password.expose_secret().clone(),
                    role: Some(Role::Admin.as_str().to_string()),
                },
                now,
            )
            .await?;

        tracing::info!(user_id = user.id, "Admin user created successfully.");
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::verify_password_hash;
    use crate::workflow::fixtures;
    use secrecy::Secret;

    fn input(username: &str, email: &str, role: Option<&str>) -> UserInput {
        UserInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "Password123".to_string(),
            role: role.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn stores_salted_hash_and_defaults_to_uploader() {
        let (workflow, _) = fixtures::workflow().await;
        let user = workflow
            .create_user(input("john", "John@GospelTube.test", None), Utc::now())
            .await
            .unwrap();

        assert_eq!(user.role, Role::Uploader);
        assert_eq!(user.email, "john@gospeltube.test");
        assert_ne!(user.password_hash, "Password123");
        assert!(verify_password_hash(&user.password_hash, "Password123").is_ok());
    }

    #[tokio::test]
    async fn rejects_duplicates_and_bad_input() {
        let (workflow, _) = fixtures::workflow().await;
        workflow
            .create_user(input("john", "john@gospeltube.test", Some("admin")), Utc::now())
            .await
            .unwrap();

        assert!(matches!(
            workflow
                .create_user(input("john", "other@gospeltube.test", None), Utc::now())
                .await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            workflow
                .create_user(input("mary", "JOHN@gospeltube.test", None), Utc::now())
                .await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            workflow.create_user(input("mary", "", None), Utc::now()).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            workflow
                .create_user(input("mary", "mary@gospeltube.test", Some("editor")), Utc::now())
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn ensure_admin_runs_once() {
        let (workflow, _) = fixtures::workflow().await;
        let seed = AdminSeed {
            username: "admin".into(),
            email: "admin@gospeltube.test".into(),
            password: Secret::new("admin123".into()),
        };

        assert!(workflow.ensure_admin(None, Utc::now()).await.unwrap().is_none());

        let created = workflow.ensure_admin(Some(&seed), Utc::now()).await.unwrap();
        assert_eq!(created.map(|u| u.role), Some(Role::Admin));

        let again = workflow.ensure_admin(Some(&seed), Utc::now()).await.unwrap();
        assert!(again.is_none());
    }
}
