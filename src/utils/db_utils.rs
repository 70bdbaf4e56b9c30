use actix_web::error::ErrorBadRequest;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::model::{employee::Employee, request::Request};
use crate::store::Document;

/// ===============================
/// Build a merge-patch from a partial update body
/// ===============================
///
/// Only keys listed in `allowed` survive; explicit `null`s are kept so the
/// store can clear optional fields.
pub fn build_patch(payload: &Value, allowed: &[&str]) -> Result<Document, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ErrorBadRequest(format!("Field '{}' cannot be updated", unknown)));
    }

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    Ok(obj.clone())
}

/// ===============================
/// Pagination
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageParams {
    pub page: u32,
    pub per_page: u32,
}

impl PageParams {
    /// Page defaults to 1, page size to 20 and is clamped to 1..=100.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        PageParams {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[aliases(EmployeeListResponse = Paginated<Employee>, RequestListResponse = Paginated<Request>)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: usize,
}

pub fn paginate<T>(items: Vec<T>, params: PageParams) -> Paginated<T> {
    let total = items.len();
    let data = items
        .into_iter()
        .skip(params.offset())
        .take(params.per_page as usize)
        .collect();

    Paginated {
        data,
        page: params.page,
        per_page: params.per_page,
        total,
    }
}
