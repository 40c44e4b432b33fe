use std::sync::Arc;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::Error;
use crate::models::{NewUser, ProfileUpdate, User};
use yumstepper_common::traits::repository_traits::UserRepository;

pub struct UserService {
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository + Send + Sync>) -> Self {
        Self { users }
    }

    /// Sign-up. The balance always starts at zero.
    pub async fn register(&self, new_user: NewUser) -> Result<User, Error> {
        validate_username(&new_user.username)?;
        validate_email(&new_user.email)?;
        if new_user.password_hash.is_empty() {
            return Err(Error::InvalidInput("password is required".to_string()));
        }

        if self.users.get_user_by_username(&new_user.username).await?.is_some() {
            return Err(Error::InvalidInput(format!(
                "username '{}' already exists",
                new_user.username
            )));
        }

        let user = User {
            user_id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            points_earned: 0,
            created_at: Utc::now(),
        };
        self.users.create_user(&user).await?;

        info!("Registered user {} ('{}')", user.user_id, user.username);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, Error> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<User, Error> {
        self.users
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user '{}'", username)))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.users.list_users().await
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<i64, Error> {
        self.users
            .get_balance(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }

    /// Username/email only; the balance is not reachable from here.
    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<User, Error> {
        if let Some(name) = update.username.as_deref() {
            validate_username(name)?;
        }
        if let Some(email) = update.email.as_deref() {
            validate_email(email)?;
        }

        self.users
            .update_profile(user_id, &update)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }
}

fn validate_username(username: &str) -> Result<(), Error> {
    if username.trim().chars().count() < 3 {
        return Err(Error::InvalidInput("username must be at least 3 characters".to_string()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), Error> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::InvalidInput(format!("invalid email '{}'", email))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_and_email_rules() {
        assert!(validate_username("ann").is_ok());
        assert!(validate_username(" a ").is_err());
        assert!(validate_email("walker@example.com").is_ok());
        assert!(validate_email("walker").is_err());
        assert!(validate_email("@example.com").is_err());
    }
}
