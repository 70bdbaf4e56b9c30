//! Shared fixtures for the handler tests.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::jwt::generate_access_token;
use crate::config::Config;
use crate::model::{permission::Service, user::User};
use crate::store::{DocumentStore, MemoryStore};

pub fn store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new())
}

pub fn bearer(username: &str, is_superadmin: bool, services: &[Service]) -> String {
    let user = User {
        username: username.to_string(),
        password_hash: String::new(),
        is_superadmin,
        services: services.to_vec(),
        is_active: true,
        created_at: Utc::now(),
    };
    let token = generate_access_token(&user, &Config::test().jwt_secret, 3600).unwrap();
    format!("Bearer {}", token)
}

/// Full routing table over the given store, with the test config.
macro_rules! test_app {
    ($store:expr) => {{
        let config = $crate::config::Config::test();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::from($store.clone()))
                .app_data(actix_web::web::Data::new(config.clone()))
                .configure(|cfg| $crate::routes::configure(cfg, &config)),
        )
        .await
    }};
}

pub(crate) use test_app;
