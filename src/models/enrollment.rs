use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::constants::RegistrationMode;

/// Enrollment gates whether and how a farm participates in the ETL service.
/// One row per farm, maps to `farm_service_registrations`. Never hard-deleted;
/// disabled through `is_enabled`/`is_active` and the stop date instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub farm_id: i64,
    pub is_enabled: bool,
    pub registration_mode: String, // Store as string to match database
    pub activated_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub stopped_on: Option<NaiveDate>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// Fresh automatic enrollment activated on `today`
    pub fn auto(farm_id: i64, today: NaiveDate) -> Self {
        Self {
            farm_id,
            is_enabled: true,
            registration_mode: RegistrationMode::Auto.as_str().to_string(),
            activated_on: today,
            expires_on: None,
            stopped_on: None,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    pub fn parse_mode(&self) -> Result<RegistrationMode, String> {
        self.registration_mode.parse()
    }

    /// Whether the scheduled pipeline should pick this farm up on `today`.
    ///
    /// Expiry is inclusive (still valid on the expiry date); a stop date takes
    /// effect on the day itself.
    pub fn is_scheduled_on(&self, today: NaiveDate) -> bool {
        self.is_enabled
            && self.is_active
            && self.registration_mode == RegistrationMode::Auto.as_str()
            && self.activated_on <= today
            && self.stopped_on.map_or(true, |stop| stop > today)
            && self.expires_on.map_or(true, |expiry| expiry >= today)
    }
}
