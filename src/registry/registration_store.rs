use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::RegistrationStore;
use crate::constants::RegistrationMode;
use crate::error::{OrchestratorError, Result};
use crate::models::Enrollment;

/// Postgres-backed enrollment store. The unique key on `farm_id` makes the
/// upsert a single conditional write; concurrent callers resolve last-writer-wins.
#[derive(Debug, Clone)]
pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    #[instrument(skip(self))]
    async fn upsert_manual(&self, farm_id: i64) -> Result<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO farm_service_registrations
                (farm_id, is_enabled, registration_mode, activated_on, is_active, updated_at)
            VALUES ($1, TRUE, $2, CURRENT_DATE, TRUE, NOW())
            ON CONFLICT (farm_id) DO UPDATE SET
                is_enabled = TRUE,
                registration_mode = EXCLUDED.registration_mode,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING farm_id, is_enabled, registration_mode, activated_on,
                      expires_on, stopped_on, is_active, updated_at
            "#,
        )
        .bind(farm_id)
        .bind(RegistrationMode::Manual.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| OrchestratorError::storage_unavailable(e.to_string()))?;

        Ok(enrollment)
    }

    async fn find(&self, farm_id: i64) -> Result<Option<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT farm_id, is_enabled, registration_mode, activated_on,
                   expires_on, stopped_on, is_active, updated_at
            FROM farm_service_registrations
            WHERE farm_id = $1
            "#,
        )
        .bind(farm_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| OrchestratorError::storage_unavailable(e.to_string()))
    }
}
