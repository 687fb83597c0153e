use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;

use crate::error::AppError;
use crate::models::{AccessUpdate, Bucket, BucketAccess, EndpointType};
use crate::regions::Catalog;

const BUCKET_META: &str = ".bucket_meta.json";

type BucketKey = (String, String);

/// File-system backed bucket store. Each bucket is a directory
/// `<root>/buckets/<cluster>/<label>/` holding its metadata and objects.
pub struct StorageEngine {
    root: PathBuf,
    catalog: Catalog,
    /// In-memory bucket metadata index (persisted to disk)
    buckets: RwLock<BTreeMap<BucketKey, Bucket>>,
}

impl StorageEngine {
    /// Initialize the storage engine, creating the data directory if needed
    pub fn new(root: &str) -> Result<Self, AppError> {
        let root = PathBuf::from(root).join("buckets");
        fs::create_dir_all(&root)
            .map_err(|e| AppError::StorageError(format!("Cannot create data dir: {}", e)))?;

        let engine = Self {
            root,
            catalog: Catalog,
            buckets: RwLock::new(BTreeMap::new()),
        };

        engine.scan_buckets()?;
        Ok(engine)
    }

    /// Load every `<cluster>/<label>` directory that carries metadata
    fn scan_buckets(&self) -> Result<(), AppError> {
        let mut buckets = self.write_index()?;
        for cluster_dir in fs::read_dir(&self.root)?.flatten() {
            if !cluster_dir.path().is_dir() {
                continue;
            }
            for entry in fs::read_dir(cluster_dir.path())?.flatten() {
                let meta_path = entry.path().join(BUCKET_META);
                if !meta_path.exists() {
                    continue;
                }
                let data = fs::read_to_string(&meta_path)?;
                match serde_json::from_str::<Bucket>(&data) {
                    Ok(mut bucket) => {
                        let (objects, size) = Self::dir_stats(&entry.path().join("objects"));
                        bucket.objects = objects;
                        bucket.size = size;
                        buckets.insert((bucket.cluster.clone(), bucket.label.clone()), bucket);
                    }
                    Err(e) => tracing::warn!("Skipping {}: {}", meta_path.display(), e),
                }
            }
        }
        tracing::debug!("Loaded {} bucket(s)", buckets.len());
        Ok(())
    }

    fn read_index(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<BucketKey, Bucket>>, AppError> {
        self.buckets
            .read()
            .map_err(|_| AppError::StorageError("bucket index lock poisoned".to_string()))
    }

    fn write_index(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<BucketKey, Bucket>>, AppError> {
        self.buckets
            .write()
            .map_err(|_| AppError::StorageError("bucket index lock poisoned".to_string()))
    }

    fn bucket_path(&self, cluster: &str, label: &str) -> PathBuf {
        self.root.join(cluster).join(label)
    }

    fn persist(&self, bucket: &Bucket) -> Result<(), AppError> {
        let meta_path = self.bucket_path(&bucket.cluster, &bucket.label).join(BUCKET_META);
        fs::write(meta_path, serde_json::to_string_pretty(bucket)?)?;
        Ok(())
    }

    fn not_found(cluster: &str, label: &str) -> AppError {
        AppError::BucketNotFound {
            cluster: cluster.to_string(),
            label: label.to_string(),
        }
    }

    // ─── Bucket Operations ────────────────────────────────────────

    pub fn validate_bucket_name(name: &str) -> Result<(), AppError> {
        if name.len() < 3 || name.len() > 63 {
            return Err(AppError::InvalidBucketName(
                "Bucket name must be between 3 and 63 characters".to_string(),
            ));
        }
        if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.') {
            return Err(AppError::InvalidBucketName(
                "Bucket name can only contain lowercase letters, numbers, hyphens, and periods".to_string(),
            ));
        }
        if name.starts_with('-') || name.ends_with('-') {
            return Err(AppError::InvalidBucketName(
                "Bucket name cannot start or end with a hyphen".to_string(),
            ));
        }
        Ok(())
    }

    pub fn create_bucket(
        &self,
        label: &str,
        cluster: &str,
        endpoint_type: Option<EndpointType>,
    ) -> Result<Bucket, AppError> {
        Self::validate_bucket_name(label)?;
        let cluster_info = self
            .catalog
            .cluster(cluster)
            .ok_or_else(|| AppError::UnknownCluster(cluster.to_string()))?;

        let mut buckets = self.write_index()?;
        let key = (cluster.to_string(), label.to_string());
        if buckets.contains_key(&key) {
            return Err(AppError::BucketAlreadyExists {
                cluster: cluster.to_string(),
                label: label.to_string(),
            });
        }

        fs::create_dir_all(self.bucket_path(cluster, label).join("objects"))?;

        let bucket = Bucket {
            label: label.to_string(),
            cluster: cluster.to_string(),
            region: cluster_info.region.to_string(),
            hostname: format!("{}.{}", label, cluster_info.domain),
            endpoint_type,
            created: Utc::now(),
            objects: 0,
            size: 0,
            access: BucketAccess::default(),
        };
        self.persist(&bucket)?;

        buckets.insert(key, bucket.clone());
        tracing::info!("Created bucket: {}/{}", cluster, label);
        Ok(bucket)
    }

    pub fn list_buckets(&self) -> Result<Vec<Bucket>, AppError> {
        Ok(self.read_index()?.values().cloned().collect())
    }

    pub fn get_bucket(&self, cluster: &str, label: &str) -> Result<Bucket, AppError> {
        self.read_index()?
            .get(&(cluster.to_string(), label.to_string()))
            .cloned()
            .ok_or_else(|| Self::not_found(cluster, label))
    }

    pub fn delete_bucket(&self, cluster: &str, label: &str) -> Result<(), AppError> {
        let mut buckets = self.write_index()?;
        let key = (cluster.to_string(), label.to_string());
        if !buckets.contains_key(&key) {
            return Err(Self::not_found(cluster, label));
        }

        let objects_dir = self.bucket_path(cluster, label).join("objects");
        if objects_dir.exists() && fs::read_dir(&objects_dir)?.next().is_some() {
            return Err(AppError::StorageError(
                "Bucket is not empty. Delete all objects first.".to_string(),
            ));
        }

        fs::remove_dir_all(self.bucket_path(cluster, label))?;
        buckets.remove(&key);
        tracing::info!("Deleted bucket: {}/{}", cluster, label);
        Ok(())
    }

    // ─── Access ───────────────────────────────────────────────────

    pub fn get_access(&self, cluster: &str, label: &str) -> Result<BucketAccess, AppError> {
        Ok(self.get_bucket(cluster, label)?.access)
    }

    /// Apply an access update. A missing ACL leaves the current one in place.
    pub fn update_access(&self, cluster: &str, label: &str, update: AccessUpdate) -> Result<BucketAccess, AppError> {
        let mut buckets = self.write_index()?;
        let key = (cluster.to_string(), label.to_string());
        let mut bucket = buckets
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::not_found(cluster, label))?;

        if let Some(acl) = update.acl {
            bucket.access.acl = acl;
        }
        bucket.access.cors_enabled = update.cors_enabled;
        self.persist(&bucket)?;

        tracing::info!(
            "Updated access for {}/{}: acl={} cors={}",
            cluster,
            label,
            bucket.access.acl.as_str(),
            bucket.access.cors_enabled
        );
        let access = bucket.access;
        buckets.insert(key, bucket);
        Ok(access)
    }

    /// Recount objects and bytes for a bucket from what is on disk
    pub fn refresh_usage(&self, cluster: &str, label: &str) -> Result<Bucket, AppError> {
        let (objects, size) = Self::dir_stats(&self.bucket_path(cluster, label).join("objects"));
        let mut buckets = self.write_index()?;
        let key = (cluster.to_string(), label.to_string());
        let mut bucket = buckets
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::not_found(cluster, label))?;
        bucket.objects = objects;
        bucket.size = size;
        self.persist(&bucket)?;
        buckets.insert(key, bucket.clone());
        Ok(bucket)
    }

    fn dir_stats(dir: &Path) -> (u64, u64) {
        let mut count = 0u64;
        let mut size = 0u64;

        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    let (c, s) = Self::dir_stats(&path);
                    count += c;
                    size += s;
                } else {
                    count += 1;
                    size += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                }
            }
        }

        (count, size)
    }
}

pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["bytes", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }
    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AclType;

    fn engine() -> (tempfile::TempDir, StorageEngine) {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::new(dir.path().to_str().unwrap()).unwrap();
        (dir, engine)
    }

    #[test]
    fn create_and_reload_bucket() {
        let (dir, engine) = engine();
        let bucket = engine.create_bucket("photos", "us-east-1", Some(EndpointType::E2)).unwrap();
        assert_eq!(bucket.region, "us-east");
        assert_eq!(bucket.hostname, "photos.us-east-1.cloudshelf.local");

        fs::write(dir.path().join("buckets/us-east-1/photos/objects/cat.jpg"), b"meow").unwrap();

        let reloaded = StorageEngine::new(dir.path().to_str().unwrap()).unwrap();
        let bucket = reloaded.get_bucket("us-east-1", "photos").unwrap();
        assert_eq!(bucket.endpoint_type, Some(EndpointType::E2));
        assert_eq!(bucket.objects, 1);
        assert_eq!(bucket.size, 4);
    }

    #[test]
    fn rejects_duplicates_and_unknown_clusters() {
        let (_dir, engine) = engine();
        engine.create_bucket("logs", "local-1", None).unwrap();
        assert!(matches!(
            engine.create_bucket("logs", "local-1", None),
            Err(AppError::BucketAlreadyExists { .. })
        ));
        assert!(matches!(
            engine.create_bucket("logs", "moon-1", None),
            Err(AppError::UnknownCluster(_))
        ));
        assert!(matches!(
            engine.create_bucket("No", "local-1", None),
            Err(AppError::InvalidBucketName(_))
        ));
        // Same label is fine in another cluster.
        engine.create_bucket("logs", "us-ord-1", None).unwrap();
        assert_eq!(engine.list_buckets().unwrap().len(), 2);
    }

    #[test]
    fn custom_acl_update_keeps_stored_acl() {
        let (_dir, engine) = engine();
        engine.create_bucket("site", "local-1", None).unwrap();
        assert!(matches!(
            engine.update_access("local-1", "nope", AccessUpdate::new(AclType::Private, false)),
            Err(AppError::BucketNotFound { .. })
        ));

        let access = engine
            .update_access("local-1", "site", AccessUpdate::new(AclType::PublicRead, false))
            .unwrap();
        assert_eq!(access.acl, AclType::PublicRead);

        let access = engine
            .update_access("local-1", "site", AccessUpdate::new(AclType::Custom, true))
            .unwrap();
        assert_eq!(access, BucketAccess { acl: AclType::PublicRead, cors_enabled: true });
    }

    #[test]
    fn failed_write_leaves_index_untouched() {
        let (dir, engine) = engine();
        engine.create_bucket("site", "local-1", None).unwrap();
        let bucket_dir = dir.path().join("buckets/local-1/site");
        fs::write(bucket_dir.join("objects/a.txt"), b"hello").unwrap();

        let meta = bucket_dir.join(BUCKET_META);
        fs::remove_file(&meta).unwrap();
        fs::create_dir(&meta).unwrap();

        assert!(engine
            .update_access("local-1", "site", AccessUpdate::new(AclType::PublicReadWrite, true))
            .is_err());
        assert_eq!(engine.get_access("local-1", "site").unwrap(), BucketAccess::default());

        assert!(engine.refresh_usage("local-1", "site").is_err());
        let bucket = engine.get_bucket("local-1", "site").unwrap();
        assert_eq!((bucket.objects, bucket.size), (0, 0));
    }

    #[test]
    fn delete_requires_empty_bucket() {
        let (dir, engine) = engine();
        engine.create_bucket("tmp-data", "local-1", None).unwrap();
        let obj = dir.path().join("buckets/local-1/tmp-data/objects/a.txt");
        fs::write(&obj, b"x").unwrap();
        assert!(engine.delete_bucket("local-1", "tmp-data").is_err());

        fs::remove_file(&obj).unwrap();
        engine.delete_bucket("local-1", "tmp-data").unwrap();
        assert!(matches!(
            engine.get_bucket("local-1", "tmp-data"),
            Err(AppError::BucketNotFound { .. })
        ));
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(human_readable_size(512), "512 bytes");
        assert_eq!(human_readable_size(1536), "1.50 KB");
        assert_eq!(human_readable_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }
}
