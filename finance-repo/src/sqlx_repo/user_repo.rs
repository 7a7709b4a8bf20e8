use crate::sqlx_repo::SQLxRepo;
use crate::user_repo::{User, UserRepo, UserRepoError};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::{query, query_as};
use tracing::instrument;

#[async_trait]
impl UserRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<User, UserRepoError> {
        let user: Option<User> = query_as::<_, User>(
            "SELECT id, name, password_hash, access_token FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Unable to get user {}", user_id))?;
        user.ok_or_else(|| UserRepoError::UserNotFound(user_id.to_owned()))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create_user(&self, user: User) -> Result<(), UserRepoError> {
        let result = query(
            "INSERT INTO users(id, name, password_hash, access_token) VALUES($1, $2, $3, $4) ON CONFLICT DO NOTHING",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.access_token)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Unable to create user {}", user.id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(UserRepoError::UserAlreadyExists(user.id))
        }
    }

    #[instrument(skip(self, access_token))]
    async fn set_access_token(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<(), UserRepoError> {
        let result = query("UPDATE users SET access_token = $1 WHERE id = $2")
            .bind(access_token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to store access token for {}", user_id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(UserRepoError::UserNotFound(user_id.to_owned()))
        }
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> Result<(), UserRepoError> {
        let result = query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete user {}", user_id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(UserRepoError::UserNotFound(user_id.to_owned()))
        }
    }
}
