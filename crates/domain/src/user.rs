use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use derive_more::Deref;
use uuid::Uuid;

use crate::{
    CreateError, DeleteError, Email, Name, ReadError, TrainingPlanID, UpdateError, ValidationError,
};

#[allow(async_fn_in_trait)]
pub trait UserService {
    /// List all user profiles. Requires an administrator.
    async fn get_users(&self, actor: &User) -> Result<Vec<User>, ReadError>;
    async fn get_user(&self, id: UserID) -> Result<User, ReadError>;
    async fn rename_user(&self, id: UserID, name: Name) -> Result<User, UpdateError>;
    /// Remove a user profile. Requires an administrator.
    ///
    /// Only the profile document is removed, the identity and any owned data stay.
    async fn delete_user(&self, actor: &User, id: UserID) -> Result<UserID, DeleteError>;

    fn validate_user_name(&self, name: &str) -> Result<Name, ValidationError> {
        Name::parse("name", name)
    }
}

#[allow(async_fn_in_trait)]
pub trait UserRepository {
    async fn read_users(&self) -> Result<Vec<User>, ReadError>;
    async fn read_user(&self, id: UserID) -> Result<User, ReadError>;
    async fn create_user(&self, user: User) -> Result<User, CreateError>;
    async fn rename_user(&self, id: UserID, name: Name) -> Result<User, UpdateError>;
    async fn add_favorite(&self, id: UserID, plan: TrainingPlanID) -> Result<(), UpdateError>;
    async fn remove_favorite(&self, id: UserID, plan: TrainingPlanID)
    -> Result<(), UpdateError>;
    async fn delete_user(&self, id: UserID) -> Result<UserID, DeleteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserID,
    pub email: Email,
    pub name: Name,
    pub role: Role,
    pub favorites: BTreeSet<TrainingPlanID>,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Deref, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct UserID(Uuid);

impl UserID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for UserID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for UserID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

impl fmt::Display for UserID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Role::User => "user",
                Role::Admin => "admin",
            }
        )
    }
}
