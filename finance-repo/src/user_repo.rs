use async_trait::async_trait;
use thiserror::Error;

#[async_trait]
pub trait UserRepo: Sync + Send {
    async fn get_user(&self, user_id: &str) -> Result<User, UserRepoError>;
    async fn create_user(&self, user: User) -> Result<(), UserRepoError>;
    async fn set_access_token(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<(), UserRepoError>;
    async fn delete_user(&self, user_id: &str) -> Result<(), UserRepoError>;
}

/// A registered user. `id` is the user's email address.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub password_hash: String,
    pub access_token: Option<String>,
}

impl User {
    pub fn new(id: String, name: String, password_hash: String) -> User {
        User {
            id,
            name,
            password_hash,
            access_token: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum UserRepoError {
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("User {0} already exists")]
    UserAlreadyExists(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
