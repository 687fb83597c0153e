use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::AppError;
use crate::models::{
    CreateInstanceRequest, Instance, InstanceOrderBy, Maintenance, Order,
};
use crate::regions::Catalog;

const INSTANCES_FILE: &str = "instances.json";

/// Instance records, persisted as a single JSON document.
pub struct InstanceRegistry {
    path: PathBuf,
    catalog: Catalog,
    instances: RwLock<Vec<Instance>>,
}

impl InstanceRegistry {
    pub fn new(root: &str) -> Result<Self, AppError> {
        let root = PathBuf::from(root);
        fs::create_dir_all(&root)
            .map_err(|e| AppError::StorageError(format!("Cannot create data dir: {}", e)))?;

        let path = root.join(INSTANCES_FILE);
        let instances = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            catalog: Catalog,
            instances: RwLock::new(instances),
        })
    }

    fn lock_poisoned() -> AppError {
        AppError::StorageError("instance registry lock poisoned".to_string())
    }

    fn persist(&self, instances: &[Instance]) -> Result<(), AppError> {
        fs::write(&self.path, serde_json::to_string_pretty(instances)?)?;
        Ok(())
    }

    pub fn create(&self, request: CreateInstanceRequest) -> Result<Instance, AppError> {
        let label = request.label.trim();
        if label.len() < 3 || label.len() > 64 {
            return Err(AppError::InvalidInstance(
                "Label must be between 3 and 64 characters".to_string(),
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            return Err(AppError::InvalidInstance(
                "Label can only contain letters, numbers, dashes, underscores, and periods".to_string(),
            ));
        }
        if self.catalog.region(&request.region).is_none() {
            return Err(AppError::UnknownRegion(request.region));
        }

        let mut instances = self.instances.write().map_err(|_| Self::lock_poisoned())?;
        if instances.iter().any(|i| i.label == label) {
            return Err(AppError::InvalidInstance(format!("Label '{}' is already in use", label)));
        }

        let instance = Instance {
            id: instances.iter().map(|i| i.id).max().unwrap_or(0) + 1,
            label: label.to_string(),
            region: request.region,
            status: request.status,
            tags: request.tags,
            created: Utc::now(),
            maintenance: None,
        };
        let mut next = instances.clone();
        next.push(instance.clone());
        self.persist(&next)?;
        *instances = next;

        tracing::info!("Created instance {} ({})", instance.id, instance.label);
        Ok(instance)
    }

    pub fn get(&self, id: u64) -> Result<Instance, AppError> {
        let instances = self.instances.read().map_err(|_| Self::lock_poisoned())?;
        instances
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(AppError::InstanceNotFound(id))
    }

    pub fn delete(&self, id: u64) -> Result<(), AppError> {
        let mut instances = self.instances.write().map_err(|_| Self::lock_poisoned())?;
        let idx = instances
            .iter()
            .position(|i| i.id == id)
            .ok_or(AppError::InstanceNotFound(id))?;
        let mut next = instances.clone();
        next.remove(idx);
        self.persist(&next)?;
        *instances = next;
        tracing::info!("Deleted instance {}", id);
        Ok(())
    }

    /// Set or clear pending maintenance on an instance.
    pub fn set_maintenance(&self, id: u64, maintenance: Option<Maintenance>) -> Result<Instance, AppError> {
        let mut instances = self.instances.write().map_err(|_| Self::lock_poisoned())?;
        let mut next = instances.clone();
        let instance = next
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(AppError::InstanceNotFound(id))?;
        instance.maintenance = maintenance;
        let updated = instance.clone();
        self.persist(&next)?;
        *instances = next;

        match &updated.maintenance {
            Some(m) => tracing::info!("Scheduled {} for instance {} at {}", m.kind.as_str(), id, m.when),
            None => tracing::info!("Cleared maintenance for instance {}", id),
        }
        Ok(updated)
    }

    /// All instances in display order.
    pub fn list(&self, order_by: InstanceOrderBy, order: Order) -> Result<Vec<Instance>, AppError> {
        let mut list = self.instances.read().map_err(|_| Self::lock_poisoned())?.clone();
        sort_instances(&mut list, order_by, order);
        Ok(list)
    }
}

/// Stable sort, ties broken by id.
pub fn sort_instances(list: &mut [Instance], order_by: InstanceOrderBy, order: Order) {
    list.sort_by(|a, b| {
        let primary = match order_by {
            InstanceOrderBy::Label => a.label.to_lowercase().cmp(&b.label.to_lowercase()),
            InstanceOrderBy::Status => a.status.as_str().cmp(b.status.as_str()),
            InstanceOrderBy::Region => a.region.cmp(&b.region),
            InstanceOrderBy::Created => a.created.cmp(&b.created),
        };
        let primary = match order {
            Order::Asc => primary,
            Order::Desc => primary.reverse(),
        };
        primary.then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InstanceStatus, MaintenanceKind};

    fn request(label: &str, region: &str) -> CreateInstanceRequest {
        CreateInstanceRequest {
            label: label.to_string(),
            region: region.to_string(),
            status: InstanceStatus::Running,
            tags: vec![],
        }
    }

    #[test]
    fn create_list_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let registry = InstanceRegistry::new(root).unwrap();
        let web = registry.create(request("web-1", "us-east")).unwrap();
        let db = registry.create(request("DB-1", "eu-central")).unwrap();
        assert_eq!((web.id, db.id), (1, 2));

        let labels: Vec<_> = registry
            .list(InstanceOrderBy::Label, Order::Asc)
            .unwrap()
            .into_iter()
            .map(|i| i.label)
            .collect();
        assert_eq!(labels, ["DB-1", "web-1"]);

        let reloaded = InstanceRegistry::new(root).unwrap();
        assert_eq!(reloaded.get(2).unwrap().region, "eu-central");
    }

    #[test]
    fn rejects_bad_instances() {
        let dir = tempfile::tempdir().unwrap();
        let registry = InstanceRegistry::new(dir.path().to_str().unwrap()).unwrap();
        assert!(matches!(registry.create(request("ab", "us-east")), Err(AppError::InvalidInstance(_))));
        assert!(matches!(registry.create(request("web 1", "us-east")), Err(AppError::InvalidInstance(_))));
        assert!(matches!(registry.create(request("web-1", "mars")), Err(AppError::UnknownRegion(_))));
        registry.create(request("web-1", "us-east")).unwrap();
        assert!(matches!(registry.create(request("web-1", "us-ord")), Err(AppError::InvalidInstance(_))));
    }

    #[test]
    fn maintenance_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let registry = InstanceRegistry::new(dir.path().to_str().unwrap()).unwrap();
        let instance = registry.create(request("web-1", "us-east")).unwrap();

        let when = Utc::now();
        let updated = registry
            .set_maintenance(instance.id, Some(Maintenance { kind: MaintenanceKind::Reboot, when }))
            .unwrap();
        assert!(updated.maintenance.is_some());

        let cleared = registry.set_maintenance(instance.id, None).unwrap();
        assert!(cleared.maintenance.is_none());
        assert!(matches!(registry.set_maintenance(99, None), Err(AppError::InstanceNotFound(99))));
    }

    #[test]
    fn failed_write_leaves_registry_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let registry = InstanceRegistry::new(dir.path().to_str().unwrap()).unwrap();
        let web = registry.create(request("web-1", "us-east")).unwrap();

        let file = dir.path().join(INSTANCES_FILE);
        fs::remove_file(&file).unwrap();
        fs::create_dir(&file).unwrap();

        assert!(registry.create(request("web-2", "us-east")).is_err());
        assert!(registry
            .set_maintenance(web.id, Some(Maintenance { kind: MaintenanceKind::Reboot, when: Utc::now() }))
            .is_err());
        assert!(registry.delete(web.id).is_err());

        let list = registry.list(InstanceOrderBy::Label, Order::Asc).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].label, "web-1");
        assert!(list[0].maintenance.is_none());
    }

    #[test]
    fn descending_order_keeps_ties_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = InstanceRegistry::new(dir.path().to_str().unwrap()).unwrap();
        for label in ["a-one", "b-two", "c-three"] {
            registry.create(request(label, "us-east")).unwrap();
        }
        let ids: Vec<_> = registry
            .list(InstanceOrderBy::Region, Order::Desc)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, [1, 2, 3]);
    }
}
