use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::store::Collection;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestKind {
    Overtime,
    Leave,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Active,
    Canceled,
}

/// Overtime or leave request filed by a supervisor for one employee and day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Request {
    #[serde(default)]
    #[schema(example = "5f0c2c1e-8a43-4f7e-9a55-0a3f3c1b9d10")]
    pub id: String,
    #[schema(example = "102")]
    pub employee_id: String,
    pub kind: RequestKind,
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(default)]
    #[schema(example = "Month-end inventory")]
    pub reason: String,
    #[schema(example = "sara")]
    pub supervisor: String,
    #[serde(default)]
    pub status: RequestStatus,
    #[schema(example = "2024-01-14T16:20:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub canceled_by: Option<String>,
    #[serde(default)]
    #[schema(format = "date-time", value_type = Option<String>)]
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Collection for Request {
    const COLLECTION: &'static str = "requests";
}
