use crate::{
    auth::auth::AuthUser,
    model::{
        permission::Service,
        request::{Request, RequestKind, RequestStatus},
    },
    store::{DocumentStore, Repository},
    utils::db_utils::{PageParams, RequestListResponse, paginate},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateRequest {
    #[schema(example = "102")]
    pub employee_id: String,
    pub kind: RequestKind,
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Month-end inventory")]
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<String>,
    pub kind: Option<RequestKind>,
    pub status: Option<RequestStatus>,
    /// Inclusive lower bound, `YYYY-MM-DD`
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestQuery {
    /// Defaults to 10, at most 100
    pub limit: Option<usize>,
}

impl RequestQuery {
    fn matches(&self, request: &Request) -> bool {
        self.employee_id
            .as_deref()
            .is_none_or(|id| request.employee_id == id.trim())
            && self.kind.is_none_or(|k| request.kind == k)
            && self.status.is_none_or(|s| request.status == s)
            && self.from.is_none_or(|d| request.date >= d)
            && self.to.is_none_or(|d| request.date <= d)
    }
}

/// Every request not canceled, folded into the attendance reports.
pub async fn active_requests(store: &dyn DocumentStore) -> Result<Vec<Request>, crate::store::StoreError> {
    Repository::<Request>::new(store)
        .find_by("status", RequestStatus::Active.to_string())
        .await
}

/// Create Request
///
/// The logged-in user is recorded as the supervisor.
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateRequest,
    responses(
        (status = 201, description = "Request filed", body = Request),
        (status = 400, description = "Missing employee id"),
        (status = 403, description = "Overtime service required")
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
pub async fn create_request(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    payload: web::Json<CreateRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_service(Service::Overtime)?;

    let payload = payload.into_inner();
    let employee_id = payload.employee_id.trim().to_string();
    if employee_id.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "employee_id is required"
        })));
    }

    let mut request = Request {
        id: String::new(),
        employee_id,
        kind: payload.kind,
        date: payload.date,
        reason: payload.reason.trim().to_string(),
        supervisor: auth.username.clone(),
        status: RequestStatus::Active,
        created_at: Utc::now(),
        canceled_by: None,
        canceled_at: None,
    };
    request.id = Repository::<Request>::new(store.get_ref())
        .create(None, &request)
        .await?;

    info!(
        id = %request.id,
        employee_id = %request.employee_id,
        kind = %request.kind,
        date = %request.date,
        supervisor = %request.supervisor,
        "Request filed"
    );
    Ok(HttpResponse::Created().json(request))
}

/// List Requests
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestQuery),
    responses(
        (status = 200, description = "Paginated requests, latest date first", body = RequestListResponse)
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
pub async fn list_requests(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    query: web::Query<RequestQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_service(Service::Overtime)?;

    let params = PageParams::new(query.page, query.per_page);
    let mut requests: Vec<Request> = Repository::<Request>::new(store.get_ref())
        .list()
        .await?
        .into_iter()
        .filter(|r| query.matches(r))
        .collect();
    requests.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));

    Ok(HttpResponse::Ok().json(paginate(requests, params)))
}

/// Latest Requests
///
/// Most recently filed requests, regardless of status.
#[utoipa::path(
    get,
    path = "/api/requests/latest",
    params(LatestQuery),
    responses(
        (status = 200, description = "Newest first", body = [Request])
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
pub async fn latest_requests(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    query: web::Query<LatestQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_service(Service::Overtime)?;

    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let mut requests = Repository::<Request>::new(store.get_ref()).list().await?;
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    requests.truncate(limit);

    Ok(HttpResponse::Ok().json(requests))
}

/// Cancel Request
#[utoipa::path(
    put,
    path = "/api/requests/{id}/cancel",
    params(("id", Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request canceled", body = Object, example = json!({
            "message": "Request canceled"
        })),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already canceled")
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
pub async fn cancel_request(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_service(Service::Overtime)?;

    let repo = Repository::<Request>::new(store.get_ref());
    let id = path.into_inner();

    let Some(request) = repo.get(&id).await? else {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Request not found" })));
    };

    if request.status == RequestStatus::Canceled {
        return Ok(HttpResponse::Conflict().json(json!({ "error": "Request already canceled" })));
    }

    repo.update(
        &id,
        json!({
            "status": RequestStatus::Canceled,
            "canceled_by": auth.username,
            "canceled_at": Utc::now(),
        }),
    )
    .await?;

    info!(id = %id, canceled_by = %auth.username, "Request canceled");
    Ok(HttpResponse::Ok().json(json!({ "message": "Request canceled" })))
}
