use std::sync::Arc;

use chrono::{Offset, TimeZone, Utc};

use crate::config::Config;
use crate::instances::InstanceRegistry;
use crate::models::{CreateInstanceRequest, InstanceStatus, Maintenance, MaintenanceKind};
use crate::pagination::{PageSize, PageSizeTiers};
use crate::regions::Catalog;
use crate::storage::StorageEngine;
use crate::AppState;

pub fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
    state_with(false)
}

/// Same as [`test_state`] with bucket locations resolved by region.
pub fn multi_cluster_state() -> (tempfile::TempDir, Arc<AppState>) {
    state_with(true)
}

fn state_with(multi_cluster: bool) -> (tempfile::TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().to_str().unwrap().to_string();
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: data_dir.clone(),
        default_page_size: PageSize::Fixed(25),
        page_size_tiers: PageSizeTiers::default(),
        multi_cluster,
        utc_offset: Utc.fix(),
    };
    let state = AppState {
        storage: StorageEngine::new(&data_dir).unwrap(),
        instances: InstanceRegistry::new(&data_dir).unwrap(),
        catalog: Catalog,
        config,
    };
    (dir, Arc::new(state))
}

pub fn reboot() -> Maintenance {
    Maintenance {
        kind: MaintenanceKind::Reboot,
        when: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// `total` instances labelled `vm-000`, `vm-001`, ...; the first `flagged`
/// of them have maintenance pending.
pub fn seed_instances(state: &AppState, total: usize, flagged: usize) {
    for i in 0..total {
        let instance = state
            .instances
            .create(CreateInstanceRequest {
                label: format!("vm-{:03}", i),
                region: "us-east".to_string(),
                status: InstanceStatus::Running,
                tags: vec![],
            })
            .unwrap();
        if i < flagged {
            state.instances.set_maintenance(instance.id, Some(reboot())).unwrap();
        }
    }
}
