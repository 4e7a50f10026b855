use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ContentWorkflow;
use crate::db::SubscriberRepo;
use crate::email::{dispatch, Message};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

/// Minimal shape check: `local@domain.tld`, one `@`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// A unique violation on insert means a concurrent request stored the address first.
fn insert_outcome<T>(inserted: Result<T, AppError>) -> Result<SubscribeOutcome, AppError> {
    match inserted {
        Ok(_) => Ok(SubscribeOutcome::Subscribed),
        Err(AppError::Conflict(_)) => {
            tracing::info!("Email subscribed concurrently");
            Ok(SubscribeOutcome::AlreadySubscribed)
        }
        Err(err) => Err(err),
    }
}

impl ContentWorkflow {
    #[tracing::instrument(name = "Subscribe email", skip(self, email))]
    pub async fn subscribe(&self, email: &str, now: DateTime<Utc>) -> Result<SubscribeOutcome, AppError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::Validation("Email is required.".to_string()));
        }
        if !is_valid_email(&email) {
            return Err(AppError::Validation("Invalid email address.".to_string()));
        }

        let mut transaction = self.db.begin().await?;
        let mut subscribers = SubscriberRepo::new(&mut transaction);

        if subscribers.find_by_email(&email).await?.is_some() {
            tracing::info!("Email already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        let inserted = subscribers.insert(&email, now).await;
        if insert_outcome(inserted)? == SubscribeOutcome::AlreadySubscribed {
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }
        transaction.commit().await?;
        tracing::info!("New subscriber stored");

        dispatch(
            self.notifier.clone(),
            vec![Message {
                recipient: email,
                subject: "Welcome to GospelTube".to_string(),
                body: "Hello!\n\nThank you for subscribing to GospelTube. Stay tuned for the latest videos and updates.\n\nBlessings,\nGospelTube Team".to_string(),
            }],
        );

        Ok(SubscribeOutcome::Subscribed)
    }
}
