//! In-memory farm registry and enrollment store.
//!
//! Used by tests and local development. Writes take a single write lock, which
//! gives the same atomicity as the Postgres `ON CONFLICT` upsert. Outages can be
//! simulated to exercise the `RegistryUnavailable`/`StorageUnavailable` paths.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{EntityRegistry, RegistrationStore};
use crate::constants::{PeriodKind, RegistrationMode};
use crate::error::{OrchestratorError, Result};
use crate::models::{Enrollment, Farm};

#[derive(Debug, Default)]
pub struct InMemoryFarmStore {
    farms: RwLock<BTreeMap<i64, Farm>>,
    enrollments: RwLock<HashMap<i64, Enrollment>>,
    registry_unavailable: AtomicBool,
    storage_unavailable: AtomicBool,
    upsert_calls: AtomicUsize,
}

impl InMemoryFarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a farm without an enrollment
    pub fn insert_farm(&self, farm: Farm) {
        self.farms.write().insert(farm.farm_id, farm);
    }

    /// Add a farm with an `AUTO` enrollment activated today
    pub fn insert_auto_enrolled(&self, farm: Farm) {
        let today = Utc::now().date_naive();
        self.enrollments
            .write()
            .insert(farm.farm_id, Enrollment::auto(farm.farm_id, today));
        self.insert_farm(farm);
    }

    pub fn insert_enrollment(&self, enrollment: Enrollment) {
        self.enrollments
            .write()
            .insert(enrollment.farm_id, enrollment);
    }

    pub fn enrollment_count(&self) -> usize {
        self.enrollments.read().len()
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn set_registry_unavailable(&self, unavailable: bool) {
        self.registry_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_storage_unavailable(&self, unavailable: bool) {
        self.storage_unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_registry(&self) -> Result<()> {
        if self.registry_unavailable.load(Ordering::SeqCst) {
            return Err(OrchestratorError::registry_unavailable(
                "in-memory registry marked unavailable",
            ));
        }
        Ok(())
    }

    fn check_storage(&self) -> Result<()> {
        if self.storage_unavailable.load(Ordering::SeqCst) {
            return Err(OrchestratorError::storage_unavailable(
                "in-memory store marked unavailable",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityRegistry for InMemoryFarmStore {
    async fn list_scheduled_targets(&self, _period_kind: PeriodKind) -> Result<Vec<Farm>> {
        self.check_registry()?;
        let today = Utc::now().date_naive();
        let farms = self.farms.read();
        let enrollments = self.enrollments.read();

        // BTreeMap iteration keeps ascending farm id order
        Ok(farms
            .values()
            .filter(|farm| farm.is_active)
            .filter(|farm| {
                enrollments
                    .get(&farm.farm_id)
                    .is_some_and(|e| e.is_scheduled_on(today))
            })
            .cloned()
            .collect())
    }

    async fn exists(&self, farm_id: i64) -> Result<bool> {
        self.check_registry()?;
        Ok(self
            .farms
            .read()
            .get(&farm_id)
            .is_some_and(|farm| farm.is_active))
    }
}

#[async_trait]
impl RegistrationStore for InMemoryFarmStore {
    async fn upsert_manual(&self, farm_id: i64) -> Result<Enrollment> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_storage()?;

        let now = Utc::now();
        let mut enrollments = self.enrollments.write();
        let enrollment = enrollments
            .entry(farm_id)
            .or_insert_with(|| Enrollment::auto(farm_id, now.date_naive()));
        enrollment.is_enabled = true;
        enrollment.registration_mode = RegistrationMode::Manual.as_str().to_string();
        enrollment.is_active = true;
        enrollment.updated_at = now;

        Ok(enrollment.clone())
    }

    async fn find(&self, farm_id: i64) -> Result<Option<Enrollment>> {
        self.check_storage()?;
        Ok(self.enrollments.read().get(&farm_id).cloned())
    }
}
