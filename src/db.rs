use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::config::Config;
use crate::model::user::User;
use crate::store::{DocumentStore, MemoryStore, MySqlStore, Repository};

/// MySQL when `DATABASE_URL` is set, otherwise a process-local store.
pub async fn init_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    match &config.database_url {
        Some(url) => {
            let store = MySqlStore::connect(url).await?;
            store.ensure_schema().await?;
            info!("Connected to MySQL document store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Create the configured super-admin on first start. Skipped when no
/// password is configured or the account already exists.
pub async fn ensure_default_admin(store: &dyn DocumentStore, config: &Config) -> Result<()> {
    let Some(password) = &config.default_admin_password else {
        return Ok(());
    };

    let users = Repository::<User>::new(store);
    let key = User::key(&config.default_admin_username);

    if users.get(&key).await?.is_some() {
        return Ok(());
    }

    let admin = User {
        username: config.default_admin_username.trim().to_string(),
        password_hash: hash_password(password)?,
        is_superadmin: true,
        services: Vec::new(),
        is_active: true,
        created_at: Utc::now(),
    };
    users.create(Some(&key), &admin).await?;

    info!(username = %admin.username, "Default super-admin created");
    Ok(())
}
