use anyhow::Context;
use async_trait::async_trait;
use common_auth::{hash_password, ROLE_ADMIN};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::BootstrapAdmin;

/// Stored login record for a storefront member.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CredentialRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Public view of a member; never carries the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl CredentialRecord {
    pub fn member(&self) -> Member {
        Member {
            id: self.id,
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a member with email '{0}' already exists")]
    DuplicateEmail(String),
    #[error("credential store error: {0}")]
    Backend(#[from] sqlx::Error),
}

/// Lookup and persistence for member credentials. Emails compare
/// case-insensitively.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<CredentialRecord, StoreError>;

    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            "SELECT id, email, password_hash, role FROM members WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<CredentialRecord, StoreError> {
        sqlx::query_as::<_, CredentialRecord>(
            "INSERT INTO members (email, password_hash, role)
             VALUES ($1, $2, $3)
             RETURNING id, email, password_hash, role",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let unique_violation = matches!(
                &err,
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
            );
            if unique_violation {
                StoreError::DuplicateEmail(email.to_string())
            } else {
                StoreError::Backend(err)
            }
        })
    }

    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let records = sqlx::query_as::<_, CredentialRecord>(
            "SELECT id, email, password_hash, role FROM members ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<Vec<CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| record.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<CredentialRecord, StoreError> {
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|record| record.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }

        let id = records.iter().map(|record| record.id).max().unwrap_or(0) + 1;
        let record = CredentialRecord {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }
}

/// Create the configured admin unless a member with that email exists.
/// Returns whether a record was inserted.
pub async fn ensure_bootstrap_admin(
    store: &dyn CredentialStore,
    admin: &BootstrapAdmin,
) -> anyhow::Result<bool> {
    if let Some(existing) = store.find_by_email(&admin.email).await? {
        if existing.role != ROLE_ADMIN {
            warn!(
                member_id = existing.id,
                role = %existing.role,
                "Bootstrap admin email belongs to a non-admin member; leaving it unchanged"
            );
        }
        return Ok(false);
    }

    let hash = hash_password(&admin.password).context("Failed to hash bootstrap admin password")?;
    match store.insert(&admin.email, &hash, ROLE_ADMIN).await {
        Ok(record) => {
            info!(member_id = record.id, "Bootstrap admin created");
            Ok(true)
        }
        // another instance won the race
        Err(StoreError::DuplicateEmail(_)) => Ok(false),
        Err(err) => Err(err.into()),
    }
}
