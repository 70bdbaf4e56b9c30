use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::permission::Service;
use crate::store::Collection;

/// Approved account, keyed by the lowercased username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_superadmin: bool,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Collection for User {
    const COLLECTION: &'static str = "users";
}

impl User {
    pub fn key(username: &str) -> String {
        username.trim().to_lowercase()
    }

    pub fn has_service(&self, service: Service) -> bool {
        self.is_superadmin || self.services.contains(&service)
    }
}

/// What the admin endpoints return; never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserView {
    #[schema(example = "sara")]
    pub username: String,
    #[schema(example = false)]
    pub is_superadmin: bool,
    pub services: Vec<Service>,
    #[schema(example = true)]
    pub is_active: bool,
    #[schema(example = "2024-01-01T08:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            username: user.username,
            is_superadmin: user.is_superadmin,
            services: user.services,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
