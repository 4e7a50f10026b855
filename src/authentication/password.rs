use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use sqlx::SqliteConnection;

use crate::auth::Actor;
use crate::db::UserRepo;
use crate::errors::AppError;

/// Verified against when the username is unknown, so both paths cost one Argon2 run.
const FALLBACK_PASSWORD_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$\
    CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials.")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials(_) => {
                AppError::Authentication("Invalid credentials.".to_string())
            }
            AuthError::UnexpectedError(e) => {
                AppError::Unexpected(e.context("Credential validation failed"))
            }
        }
    }
}

#[tracing::instrument(name = "Validate user credentials", skip(credentials, conn), fields(username = %credentials.username))]
pub async fn validate_credentials(
    credentials: &Credentials,
    conn: &mut SqliteConnection,
) -> Result<Actor, AuthError> {
    let mut actor = None;
    let mut expected_password_hash = FALLBACK_PASSWORD_HASH.to_string();

    match UserRepo::new(conn).find_by_username(&credentials.username).await {
        Ok(Some(user)) => {
            tracing::debug!("User found with ID: {}", user.id);
            actor = Some(Actor {
                user_id: user.id,
                role: user.role,
            });
            expected_password_hash = user.password_hash;
        }
        Ok(None) => tracing::debug!("No user with that username"),
        Err(error) => {
            return Err(AuthError::UnexpectedError(anyhow::anyhow!(error).context(
                "Failed to load stored credentials",
            )))
        }
    }

    verify_password_hash(&expected_password_hash, &credentials.password)?;

    actor.ok_or_else(|| AuthError::InvalidCredentials(anyhow::anyhow!("Unknown username.")))
}

#[tracing::instrument(name = "Verify password hash", skip(expected_password_hash, password_candidate))]
pub fn verify_password_hash(
    expected_password_hash: &str,
    password_candidate: &str,
) -> Result<(), AuthError> {
    let expected_password_hash = PasswordHash::new(expected_password_hash)
        .context("Failed to parse hash in PHC string format.")?;

    Argon2::default()
        .verify_password(password_candidate.as_bytes(), &expected_password_hash)
        .context("Invalid password.")
        .map_err(|e| {
            tracing::warn!("Password verification failed");
            AuthError::InvalidCredentials(e)
        })
}

#[tracing::instrument(name = "Compute password hash", skip(password))]
pub fn compute_password_hash(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let params = Params::new(15000, 2, 1, None)
        .map_err(|e| AppError::Unexpected(anyhow::anyhow!(e).context("Failed to create Argon2 params")))?;

    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Unexpected(anyhow::anyhow!(e).context("Failed to hash password")))?
        .to_string();

    Ok(password_hash)
}
