use crate::{
    auth::auth::AuthUser,
    model::employee::{Employee, EmployeeStatus},
    store::{DocumentStore, Repository},
    utils::db_utils::{EmployeeListResponse, PageParams, build_patch, paginate},
};
use actix_web::{HttpResponse, Responder, error::ErrorBadRequest, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::str::FromStr;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_FIELDS: &[&str] = &["name", "department", "status"];

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "102")]
    pub employee_id: String,
    #[schema(example = "Ali Hassan")]
    pub name: String,
    #[schema(example = "Drivers")]
    pub department: Option<String>,
    pub status: Option<EmployeeStatus>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    #[schema(example = "Ali Hassan")]
    pub name: Option<String>,
    #[schema(example = "Warehouse", nullable = true)]
    pub department: Option<String>,
    pub status: Option<EmployeeStatus>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployeeStatus {
    pub status: EmployeeStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// `active` or `inactive`
    pub status: Option<String>,
    pub department: Option<String>,
    /// Case-insensitive match on id or name
    pub search: Option<String>,
}

fn matches(employee: &Employee, query: &EmployeeQuery, status: Option<EmployeeStatus>) -> bool {
    if status.is_some_and(|s| s != employee.status) {
        return false;
    }

    if let Some(department) = &query.department {
        let same = employee
            .department
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case(department.trim()));
        if !same {
            return false;
        }
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        return employee.employee_id.to_lowercase().contains(&needle)
            || employee.name.to_lowercase().contains(&needle);
    }

    true
}

fn parse_status(raw: &str) -> actix_web::Result<EmployeeStatus> {
    EmployeeStatus::from_str(raw.trim())
        .map_err(|_| ErrorBadRequest(format!("Unknown employee status '{}'", raw)))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Employee),
        (status = 400, description = "Missing employee id or name"),
        (status = 409, description = "Employee id already exists")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let employee_id = payload.employee_id.trim().to_string();
    let name = payload.name.trim().to_string();

    if employee_id.is_empty() || name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "employee_id and name are required"
        })));
    }

    let now = Utc::now();
    let employee = Employee {
        employee_id,
        name,
        department: payload
            .department
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        status: payload.status.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    Repository::<Employee>::new(store.get_ref())
        .create(Some(&employee.employee_id), &employee)
        .await?;

    info!(employee_id = %employee.employee_id, "Employee created");
    Ok(HttpResponse::Created().json(employee))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let params = PageParams::new(query.page, query.per_page);
    let status = query.status.as_deref().map(parse_status).transpose()?;

    let mut employees: Vec<Employee> = Repository::<Employee>::new(store.get_ref())
        .list()
        .await?
        .into_iter()
        .filter(|e| matches(e, &query, status))
        .collect();
    employees.sort_by(|a, b| crate::attendance::compare_employee_ids(&a.employee_id, &b.employee_id));

    debug!(total = employees.len(), page = params.page, per_page = params.per_page, "Listing employees");

    Ok(HttpResponse::Ok().json(paginate(employees, params)))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "error": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    match Repository::<Employee>::new(store.get_ref()).get(&employee_id).await? {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "error": "Employee not found"
        }))),
    }
}

/// Update Employee
///
/// Partial update; `department: null` clears the department.
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Invalid update body"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    let mut patch = build_patch(&body, UPDATABLE_FIELDS)?;

    match patch.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => {}
        Some(_) => return Err(ErrorBadRequest("name must be a non-empty string")),
        None => {}
    }
    match patch.get("status") {
        Some(Value::String(status)) => {
            parse_status(status)?;
        }
        Some(_) => return Err(ErrorBadRequest("status must be a string")),
        None => {}
    }
    if matches!(patch.get("department"), Some(v) if !v.is_string() && !v.is_null()) {
        return Err(ErrorBadRequest("department must be a string or null"));
    }

    patch.insert("updated_at".into(), json!(Utc::now()));

    let updated = Repository::<Employee>::new(store.get_ref())
        .update(&employee_id, patch)
        .await?;

    if !updated {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "Employee not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Set Employee Status
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}/status",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployeeStatus,
    responses(
        (status = 200, description = "Status updated", body = Object, example = json!({
            "message": "Employee status set to inactive"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_employee_status(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
    payload: web::Json<UpdateEmployeeStatus>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let updated = Repository::<Employee>::new(store.get_ref())
        .update(
            &employee_id,
            json!({"status": payload.status, "updated_at": Utc::now()}),
        )
        .await?;

    if !updated {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "Employee not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Employee status set to {}", payload.status)
    })))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    _auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    if !Repository::<Employee>::new(store.get_ref()).delete(&employee_id).await? {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "Employee not found"
        })));
    }

    info!(employee_id = %employee_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{bearer, store, test_app};
    use actix_web::{http::StatusCode, test};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    macro_rules! create {
        ($app:expr, $body:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/employees")
                .insert_header(("Authorization", bearer("sara", false, &[])))
                .set_json($body)
                .to_request();
            test::call_service(&$app, req).await.status()
        }};
    }

    #[actix_web::test]
    async fn requires_a_token() {
        let store = store();
        let app = test_app!(store);

        let req = test::TestRequest::get().uri("/api/employees").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn create_list_filter_and_delete() {
        let store = store();
        let app = test_app!(store);

        assert_eq!(
            create!(app, json!({"employee_id": "102", "name": "Ali Hassan", "department": "Drivers"})),
            StatusCode::CREATED
        );
        assert_eq!(
            create!(app, json!({"employee_id": "7", "name": "Sara", "department": "Office"})),
            StatusCode::CREATED
        );
        assert_eq!(
            create!(app, json!({"employee_id": "7", "name": "Dup"})),
            StatusCode::CONFLICT
        );
        assert_eq!(create!(app, json!({"employee_id": " ", "name": "X"})), StatusCode::BAD_REQUEST);

        let auth = bearer("sara", false, &[]);

        let req = test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("Authorization", auth.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["data"][0]["employee_id"], "7");

        let req = test::TestRequest::get()
            .uri("/api/employees?department=drivers&search=ali")
            .insert_header(("Authorization", auth.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["name"], "Ali Hassan");

        let req = test::TestRequest::delete()
            .uri("/api/employees/102")
            .insert_header(("Authorization", auth.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/employees/102")
            .insert_header(("Authorization", auth))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn update_and_status_change() {
        let store = store();
        let app = test_app!(store);
        create!(app, json!({"employee_id": "102", "name": "Ali", "department": "Drivers"}));
        let auth = bearer("sara", false, &[]);

        let req = test::TestRequest::put()
            .uri("/api/employees/102")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({"name": "Ali Hassan", "department": null}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::put()
            .uri("/api/employees/102")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({"salary": 10}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/api/employees/102/status")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({"status": "inactive"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/employees/102")
            .insert_header(("Authorization", auth.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "Ali Hassan");
        assert_eq!(body["department"], Value::Null);
        assert_eq!(body["status"], "inactive");

        let req = test::TestRequest::get()
            .uri("/api/employees?status=active")
            .insert_header(("Authorization", auth))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 0);
    }
}
