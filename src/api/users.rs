use crate::{
    auth::{auth::AuthUser, handlers::{MIN_PASSWORD_LEN, is_username_available}, password::hash_password},
    model::{
        pending_user::{PendingUser, PendingUserView},
        permission::Service,
        user::{User, UserView},
    },
    store::{DocumentStore, Repository},
    utils::username_cache,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "omar")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
    #[serde(default)]
    pub is_superadmin: bool,
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    /// New username; the account is re-keyed under it
    #[schema(example = "omar.k")]
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_superadmin: Option<bool>,
    pub services: Option<Vec<Service>>,
}

#[derive(Deserialize, ToSchema)]
pub struct ApprovePending {
    #[serde(default)]
    pub services: Vec<Service>,
}

fn hash_or_500(password: &str) -> actix_web::Result<String> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Something went wrong, Contact with system admin")
    })
}

fn short_password() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "error": format!("Password must be at least {} characters", MIN_PASSWORD_LEN)
    }))
}

fn not_found(what: &str) -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": format!("{} not found", what) }))
}

/// List Users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All approved accounts", body = [UserView]),
        (status = 403, description = "Super-admin only")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let users: Vec<UserView> = Repository::<User>::new(store.get_ref())
        .list()
        .await?
        .into_iter()
        .map(UserView::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

/// Create User
///
/// Creates an approved account directly, bypassing the sign-up queue.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserView),
        (status = 400, description = "Missing fields or short password"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let payload = payload.into_inner();
    let username = payload.username.trim();

    if username.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Username and password must not be empty"
        })));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Ok(short_password());
    }
    if !is_username_available(username, store.get_ref()).await? {
        return Ok(HttpResponse::Conflict().json(json!({ "error": "Username already taken" })));
    }

    let user = User {
        username: username.to_string(),
        password_hash: hash_or_500(&payload.password)?,
        is_superadmin: payload.is_superadmin,
        services: payload.services,
        is_active: true,
        created_at: Utc::now(),
    };
    Repository::<User>::new(store.get_ref())
        .create(Some(&User::key(username)), &user)
        .await?;
    username_cache::mark_taken(username).await;

    info!(admin = %auth.username, username = %user.username, "User created");
    Ok(HttpResponse::Created().json(UserView::from(user)))
}

/// Update User
///
/// Any subset of username, password, services and the super-admin flag.
#[utoipa::path(
    put,
    path = "/api/admin/users/{username}",
    params(("username", Path, description = "Current username")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserView),
        (status = 404, description = "User not found"),
        (status = 409, description = "New username already taken")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
    payload: web::Json<UpdateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let users = Repository::<User>::new(store.get_ref());
    let key = User::key(&path);
    let payload = payload.into_inner();

    let Some(mut user) = users.get(&key).await? else {
        return Ok(not_found("User"));
    };

    if let Some(password) = &payload.password {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Ok(short_password());
        }
        user.password_hash = hash_or_500(password)?;
    }
    if let Some(services) = payload.services {
        user.services = services;
    }
    if let Some(is_superadmin) = payload.is_superadmin {
        user.is_superadmin = is_superadmin;
    }

    let new_name = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != user.username);

    match new_name {
        Some(new_name) if User::key(new_name) != key => {
            if !is_username_available(new_name, store.get_ref()).await? {
                return Ok(HttpResponse::Conflict().json(json!({ "error": "Username already taken" })));
            }
            user.username = new_name.to_string();
            users.create(Some(&User::key(new_name)), &user).await?;
            users.delete(&key).await?;
            username_cache::mark_taken(new_name).await;
            username_cache::release(&key).await;
        }
        Some(new_name) => {
            // only the letter case changed
            user.username = new_name.to_string();
            users.update(&key, &user).await?;
        }
        None => {
            users.update(&key, &user).await?;
        }
    }

    info!(admin = %auth.username, username = %user.username, "User updated");
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

/// Toggle User Status
#[utoipa::path(
    put,
    path = "/api/admin/users/{username}/toggle-status",
    params(("username", Path, description = "Username")),
    responses(
        (status = 200, description = "Status flipped", body = Object, example = json!({
            "message": "User disabled", "is_active": false
        })),
        (status = 400, description = "Cannot disable your own account"),
        (status = 404, description = "User not found")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn toggle_user_status(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let users = Repository::<User>::new(store.get_ref());
    let key = User::key(&path);

    let Some(user) = users.get(&key).await? else {
        return Ok(not_found("User"));
    };

    if key == User::key(&auth.username) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "You cannot disable your own account"
        })));
    }

    let is_active = !user.is_active;
    users.update(&key, json!({ "is_active": is_active })).await?;

    info!(admin = %auth.username, username = %user.username, is_active, "User status toggled");
    Ok(HttpResponse::Ok().json(json!({
        "message": if is_active { "User enabled" } else { "User disabled" },
        "is_active": is_active
    })))
}

/// List Pending Sign-ups
#[utoipa::path(
    get,
    path = "/api/admin/pending",
    responses(
        (status = 200, description = "Sign-ups waiting for approval", body = [PendingUserView])
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn list_pending(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let pending: Vec<PendingUserView> = Repository::<PendingUser>::new(store.get_ref())
        .list()
        .await?
        .into_iter()
        .map(PendingUserView::from)
        .collect();

    Ok(HttpResponse::Ok().json(pending))
}

/// Approve Sign-up
#[utoipa::path(
    post,
    path = "/api/admin/pending/{username}/approve",
    params(("username", Path, description = "Pending username")),
    request_body = ApprovePending,
    responses(
        (status = 200, description = "Account approved", body = UserView),
        (status = 404, description = "No such pending sign-up")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn approve_pending(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
    payload: Option<web::Json<ApprovePending>>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let pending_repo = Repository::<PendingUser>::new(store.get_ref());
    let key = User::key(&path);

    let Some(pending) = pending_repo.get(&key).await? else {
        return Ok(not_found("Pending sign-up"));
    };

    let user = User {
        username: pending.username,
        password_hash: pending.password_hash,
        is_superadmin: false,
        services: payload.map(|p| p.into_inner().services).unwrap_or_default(),
        is_active: true,
        created_at: Utc::now(),
    };
    Repository::<User>::new(store.get_ref())
        .create(Some(&key), &user)
        .await?;
    pending_repo.delete(&key).await?;

    info!(admin = %auth.username, username = %user.username, "Sign-up approved");
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

/// Reject Sign-up
#[utoipa::path(
    post,
    path = "/api/admin/pending/{username}/reject",
    params(("username", Path, description = "Pending username")),
    responses(
        (status = 200, description = "Sign-up rejected", body = Object, example = json!({
            "message": "Sign-up rejected"
        })),
        (status = 404, description = "No such pending sign-up")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn reject_pending(
    auth: AuthUser,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let key = User::key(&path);
    if !Repository::<PendingUser>::new(store.get_ref()).delete(&key).await? {
        return Ok(not_found("Pending sign-up"));
    }
    username_cache::release(&key).await;

    info!(admin = %auth.username, username = %key, "Sign-up rejected");
    Ok(HttpResponse::Ok().json(json!({ "message": "Sign-up rejected" })))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{bearer, store, test_app};
    use crate::model::permission::Service;
    use actix_web::{http::StatusCode, test};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn non_admins_are_forbidden() {
        let store = store();
        let app = test_app!(store);

        let req = test::TestRequest::get()
            .uri("/api/admin/users")
            .insert_header(("Authorization", bearer("sara", false, &[Service::Attendance])))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn signup_then_approve_then_login() {
        let store = store();
        let app = test_app!(store);
        let admin = bearer("root", true, &[]);

        let req = test::TestRequest::post()
            .uri("/api/signup")
            .set_json(json!({"username": "flow-nadia", "password": "secret1"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri("/api/admin/pending")
            .insert_header(("Authorization", admin.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["username"], "flow-nadia");

        let req = test::TestRequest::post()
            .uri("/api/admin/pending/flow-nadia/approve")
            .insert_header(("Authorization", admin.clone()))
            .set_json(json!({"services": ["overtime"]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["services"], json!(["overtime"]));

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"username": "flow-nadia", "password": "secret1"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["services"], json!(["overtime"]));

        let req = test::TestRequest::get()
            .uri("/api/admin/pending")
            .insert_header(("Authorization", admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn reject_frees_the_username() {
        let store = store();
        let app = test_app!(store);
        let admin = bearer("root", true, &[]);

        let signup = || {
            test::TestRequest::post()
                .uri("/api/signup")
                .set_json(json!({"username": "reject-me", "password": "secret1"}))
                .to_request()
        };
        assert_eq!(test::call_service(&app, signup()).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/admin/pending/reject-me/reject")
            .insert_header(("Authorization", admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        assert_eq!(test::call_service(&app, signup()).await.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn admin_creates_renames_and_toggles() {
        let store = store();
        let app = test_app!(store);
        let admin = bearer("root", true, &[]);

        let req = test::TestRequest::post()
            .uri("/api/admin/users")
            .insert_header(("Authorization", admin.clone()))
            .set_json(json!({"username": "admin-made", "password": "secret1", "services": ["attendance"]}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::put()
            .uri("/api/admin/users/admin-made")
            .insert_header(("Authorization", admin.clone()))
            .set_json(json!({"username": "admin-renamed", "services": ["attendance", "overtime"]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["username"], "admin-renamed");

        let req = test::TestRequest::put()
            .uri("/api/admin/users/admin-renamed/toggle-status")
            .insert_header(("Authorization", admin.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_active"], false);

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"username": "admin-renamed", "password": "secret1"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/admin/users")
            .insert_header(("Authorization", admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["services"], json!(["attendance", "overtime"]));
        assert!(body[0].get("password_hash").is_none());
    }
}
