use crate::user_repo::UserRepoError::{UserAlreadyExists, UserNotFound};
use crate::user_repo::{User, UserRepo, UserRepoError};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct MemUserRepo {
    users: RwLock<HashMap<String, User>>,
}

impl MemUserRepo {
    pub fn new() -> MemUserRepo {
        MemUserRepo {
            users: RwLock::new(HashMap::new()),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<HashMap<String, User>>, anyhow::Error> {
        self.users
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<HashMap<String, User>>, anyhow::Error> {
        self.users
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl UserRepo for MemUserRepo {
    async fn get_user(&self, user_id: &str) -> Result<User, UserRepoError> {
        let read_guard = self.read_lock()?;

        read_guard
            .get(user_id)
            .cloned()
            .ok_or_else(|| UserNotFound(user_id.to_owned()))
    }

    async fn create_user(&self, user: User) -> Result<(), UserRepoError> {
        let mut write_guard = self.write_lock()?;

        match write_guard.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(UserAlreadyExists(user.id)),
            Entry::Vacant(e) => {
                e.insert(user);
                Ok(())
            }
        }
    }

    async fn set_access_token(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<(), UserRepoError> {
        let mut write_guard = self.write_lock()?;

        match write_guard.get_mut(user_id) {
            Some(user) => {
                user.access_token = Some(access_token.to_owned());
                Ok(())
            }
            None => Err(UserNotFound(user_id.to_owned())),
        }
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), UserRepoError> {
        let mut write_guard = self.write_lock()?;

        if write_guard.remove(user_id).is_some() {
            Ok(())
        } else {
            Err(UserNotFound(user_id.to_owned()))
        }
    }
}
