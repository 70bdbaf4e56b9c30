use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::Collection;

/// Sign-up waiting for a super-admin decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingUser {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Collection for PendingUser {
    const COLLECTION: &'static str = "pendingUsers";
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingUserView {
    #[schema(example = "omar")]
    pub username: String,
    #[schema(example = "2024-01-01T08:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<PendingUser> for PendingUserView {
    fn from(pending: PendingUser) -> Self {
        PendingUserView {
            username: pending.username,
            created_at: pending.created_at,
        }
    }
}
