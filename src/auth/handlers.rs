use crate::{
    auth::{
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{pending_user::PendingUser, user::User},
    models::{LoginReqDto, LoginResponse, SignupReq},
    store::{DocumentStore, Repository, StoreError},
    utils::username_cache,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, instrument};

pub const MIN_PASSWORD_LEN: usize = 6;

/// true  => username AVAILABLE
/// false => username TAKEN, as an approved user or a pending sign-up
pub async fn is_username_available(username: &str, store: &dyn DocumentStore) -> Result<bool, StoreError> {
    let key = User::key(username);

    // 1️⃣ Moka cache: fast positive
    if username_cache::is_taken(&key).await {
        return Ok(false);
    }

    // 2️⃣ Store fallback
    let taken = Repository::<User>::new(store).get(&key).await?.is_some()
        || Repository::<PendingUser>::new(store).get(&key).await?.is_some();

    if taken {
        username_cache::mark_taken(&key).await;
    }

    Ok(!taken)
}

/// Sign up
///
/// The account waits in the pending queue until a super-admin approves it.
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupReq,
    responses(
        (status = 201, description = "Sign-up queued for approval", body = Object, example = json!({
            "message": "Sign-up received, waiting for administrator approval"
        })),
        (status = 400, description = "Missing fields or short password"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_signup", skip(store, payload), fields(username = %payload.username))]
pub async fn signup(
    store: web::Data<dyn DocumentStore>,
    payload: web::Json<SignupReq>,
) -> actix_web::Result<HttpResponse> {
    let username = payload.username.trim();

    if username.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Username and password must not be empty"
        })));
    }

    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": format!("Password must be at least {} characters", MIN_PASSWORD_LEN)
        })));
    }

    if !is_username_available(username, store.get_ref()).await? {
        return Ok(HttpResponse::Conflict().json(json!({
            "error": "Username already taken"
        })));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        actix_web::error::ErrorInternalServerError("Failed to register user")
    })?;

    let pending = PendingUser {
        username: username.to_string(),
        password_hash,
        created_at: Utc::now(),
    };
    Repository::<PendingUser>::new(store.get_ref())
        .create(Some(&User::key(username)), &pending)
        .await?;
    username_cache::mark_taken(username).await;

    info!("Sign-up queued for approval");

    Ok(HttpResponse::Created().json(json!({
        "message": "Sign-up received, waiting for administrator approval"
    })))
}

/// Log in
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(store, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<dyn DocumentStore>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    // 1️⃣ Basic validation
    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().json(json!({"error": "Username or password required"}));
    }

    // 2️⃣ Fetch user
    let db_user = match Repository::<User>::new(store.get_ref())
        .get(&User::key(&user.username))
        .await
    {
        Ok(Some(found)) => {
            debug!("User found");
            found
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().json(json!({"error": "Invalid credentials"}));
        }
        Err(e) => {
            error!(error = %e, "Store error while fetching user");
            return HttpResponse::InternalServerError().json(json!({
                "error": "Something went wrong, Contact with system admin"
            }));
        }
    };

    // 3️⃣ Verify password
    if !verify_password(&user.password, &db_user.password_hash) {
        info!("Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({"error": "Invalid credentials"}));
    }

    // 4️⃣ Disabled accounts keep their data but cannot sign in
    if !db_user.is_active {
        info!("Login refused: account disabled");
        return HttpResponse::Forbidden().json(json!({"error": "Account is disabled"}));
    }

    // 5️⃣ Generate access token
    let token = match generate_access_token(&db_user, &config.jwt_secret, config.access_token_ttl) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to sign access token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        token,
        username: db_user.username,
        is_superadmin: db_user.is_superadmin,
        services: db_user.services,
    })
}
