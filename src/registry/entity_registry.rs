use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::EntityRegistry;
use crate::constants::{PeriodKind, RegistrationMode};
use crate::error::{OrchestratorError, Result};
use crate::models::Farm;

/// Postgres-backed farm registry over `farms` joined to `farm_service_registrations`
#[derive(Debug, Clone)]
pub struct PgEntityRegistry {
    pool: PgPool,
}

impl PgEntityRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityRegistry for PgEntityRegistry {
    #[instrument(skip(self))]
    async fn list_scheduled_targets(&self, period_kind: PeriodKind) -> Result<Vec<Farm>> {
        let farms = sqlx::query_as::<_, Farm>(
            r#"
            SELECT f.farm_id, f.name, f.latitude, f.longitude, f.country_code, f.is_active
            FROM farms f
            INNER JOIN farm_service_registrations r ON r.farm_id = f.farm_id
            WHERE f.is_active
              AND r.is_enabled
              AND r.is_active
              AND r.registration_mode = $1
              AND r.activated_on <= CURRENT_DATE
              AND (r.stopped_on IS NULL OR r.stopped_on > CURRENT_DATE)
              AND (r.expires_on IS NULL OR r.expires_on >= CURRENT_DATE)
            ORDER BY f.farm_id ASC
            "#,
        )
        .bind(RegistrationMode::Auto.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| OrchestratorError::registry_unavailable(e.to_string()))?;

        debug!(
            period_kind = %period_kind,
            target_count = farms.len(),
            "Fetched scheduled targets"
        );

        Ok(farms)
    }

    async fn exists(&self, farm_id: i64) -> Result<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM farms WHERE farm_id = $1 AND is_active
            )
            "#,
        )
        .bind(farm_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| OrchestratorError::registry_unavailable(e.to_string()))?;

        Ok(found)
    }
}
