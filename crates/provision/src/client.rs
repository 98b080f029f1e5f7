use crate::error::ProvisionError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Auth account to create. The email is marked confirmed and the role and
/// display name go into the user metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthUser {
    pub email: String,
    pub password: String,
    pub role: String,
    pub display_name: String,
}

/// Row of the `users` profile table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// Admin surface of the hosted auth service, plus the profile table it is
/// mirrored into.
#[async_trait]
pub trait AuthAdmin: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, ProvisionError>;

    async fn create_user(&self, user: &NewAuthUser) -> Result<AuthUser, ProvisionError>;

    async fn profile_exists(&self, user_id: &str) -> Result<bool, ProvisionError>;

    async fn insert_profile(&self, profile: &Profile) -> Result<(), ProvisionError>;
}
