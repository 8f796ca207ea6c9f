use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Farm represents the unit of work for both pipeline stages and manual tasks.
/// Owned by the master-data system; read-only here. Maps to the `farms` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Farm {
    pub farm_id: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country_code: Option<String>,
    pub is_active: bool,
}

impl Farm {
    pub fn new(farm_id: i64, name: impl Into<String>) -> Self {
        Self {
            farm_id,
            name: name.into(),
            latitude: None,
            longitude: None,
            country_code: None,
            is_active: true,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Both coordinates present, as required by weather lookups
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}
