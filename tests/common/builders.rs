use std::sync::Arc;

use farm_orchestrator::config::ManualTaskConfig;
use farm_orchestrator::models::Farm;
use farm_orchestrator::registry::InMemoryFarmStore;

/// Store with farms 1, 2 and 3 auto-enrolled; farm 2 has no coordinates
pub fn three_farm_store() -> Arc<InMemoryFarmStore> {
    let store = Arc::new(InMemoryFarmStore::new());
    store.insert_auto_enrolled(Farm::new(1, "North Field").with_coordinates(35.1, 126.9));
    store.insert_auto_enrolled(Farm::new(2, "River Plot"));
    store.insert_auto_enrolled(Farm::new(3, "Hill Orchard").with_coordinates(35.4, 127.2));
    store
}

/// Manual task config that runs `program` with `target` as the first argument
pub fn manual_config(program: &str, target: &str) -> ManualTaskConfig {
    ManualTaskConfig {
        program: program.to_string(),
        target: target.to_string(),
        ..ManualTaskConfig::default()
    }
}
