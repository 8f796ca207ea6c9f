//! # Registry
//!
//! Read access to farms eligible for processing and the enrollment records that
//! gate them. Both seams are traits so the coordinator and launcher can run
//! against Postgres in production and the in-memory store in tests.

pub mod entity_registry;
pub mod in_memory;
pub mod registration_store;

use async_trait::async_trait;

use crate::constants::PeriodKind;
use crate::error::Result;
use crate::models::{Enrollment, Farm};

pub use entity_registry::PgEntityRegistry;
pub use in_memory::InMemoryFarmStore;
pub use registration_store::PgRegistrationStore;

/// Query side of farm master data
#[async_trait]
pub trait EntityRegistry: Send + Sync {
    /// Active farms with an enabled, unexpired, unstopped `AUTO` enrollment,
    /// ascending by farm id. Store failures surface as `RegistryUnavailable`.
    async fn list_scheduled_targets(&self, period_kind: PeriodKind) -> Result<Vec<Farm>>;

    /// Whether a farm is known and active. Unknown farms are `Ok(false)`.
    async fn exists(&self, farm_id: i64) -> Result<bool>;
}

/// Owner of the per-farm enrollment row
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Insert-or-update the farm's enrollment into `MANUAL` mode in one atomic
    /// write. Store failures surface as `StorageUnavailable`.
    async fn upsert_manual(&self, farm_id: i64) -> Result<Enrollment>;

    async fn find(&self, farm_id: i64) -> Result<Option<Enrollment>>;
}
