use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::store::Collection;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
}

/// Stored under its `employee_id`, which is also the id used in the
/// attendance sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "employee_id": "102",
        "name": "Ali Hassan",
        "department": "Drivers",
        "status": "active",
        "created_at": "2024-01-01T08:00:00Z",
        "updated_at": "2024-01-01T08:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = "102")]
    pub employee_id: String,

    #[schema(example = "Ali Hassan")]
    pub name: String,

    #[schema(example = "Drivers", nullable = true)]
    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub status: EmployeeStatus,

    #[schema(example = "2024-01-01T08:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,

    #[schema(example = "2024-01-01T08:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl Collection for Employee {
    const COLLECTION: &'static str = "employees";
}
