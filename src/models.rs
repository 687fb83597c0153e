use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pagination::{PageSize, PaginationState, RequiresVisibility};

// ─── Buckets ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointType {
    E0,
    E1,
    E2,
    E3,
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndpointType::E0 => "E0",
            EndpointType::E1 => "E1",
            EndpointType::E2 => "E2",
            EndpointType::E3 => "E3",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AclType {
    #[default]
    Private,
    PublicRead,
    AuthenticatedRead,
    PublicReadWrite,
    /// Reported when the stored grants match no canned ACL; cannot be set.
    Custom,
}

impl AclType {
    pub fn as_str(self) -> &'static str {
        match self {
            AclType::Private => "private",
            AclType::PublicRead => "public-read",
            AclType::AuthenticatedRead => "authenticated-read",
            AclType::PublicReadWrite => "public-read-write",
            AclType::Custom => "custom",
        }
    }
}

impl std::str::FromStr for AclType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(AclType::Private),
            "public-read" => Ok(AclType::PublicRead),
            "authenticated-read" => Ok(AclType::AuthenticatedRead),
            "public-read-write" => Ok(AclType::PublicReadWrite),
            "custom" => Ok(AclType::Custom),
            other => Err(format!("unknown ACL '{}'", other)),
        }
    }
}

/// Represents an object storage bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub cluster: String,
    pub region: String,
    pub hostname: String,
    pub endpoint_type: Option<EndpointType>,
    pub created: DateTime<Utc>,
    pub objects: u64,
    pub size: u64,
    #[serde(default)]
    pub access: BucketAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketAccess {
    pub acl: AclType,
    pub cors_enabled: bool,
}

/// Body of an access update. The ACL is left out when it is `custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<AclType>,
    pub cors_enabled: bool,
}

impl AccessUpdate {
    pub fn new(acl: AclType, cors_enabled: bool) -> Self {
        let acl = (acl != AclType::Custom).then_some(acl);
        Self { acl, cors_enabled }
    }
}

/// Request to create a new bucket
#[derive(Debug, Deserialize)]
pub struct CreateBucketRequest {
    pub label: String,
    pub cluster: String,
    #[serde(default)]
    pub endpoint_type: Option<EndpointType>,
}

/// Response for listing buckets
#[derive(Debug, Serialize)]
pub struct ListBucketsResponse {
    pub data: Vec<Bucket>,
    pub results: usize,
}

// ─── Instances ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    #[default]
    Running,
    Offline,
    Booting,
    Rebooting,
    ShuttingDown,
    Provisioning,
    Migrating,
}

impl InstanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Running => "running",
            InstanceStatus::Offline => "offline",
            InstanceStatus::Booting => "booting",
            InstanceStatus::Rebooting => "rebooting",
            InstanceStatus::ShuttingDown => "shutting_down",
            InstanceStatus::Provisioning => "provisioning",
            InstanceStatus::Migrating => "migrating",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    Reboot,
    ColdMigration,
    LiveMigration,
}

impl MaintenanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MaintenanceKind::Reboot => "reboot",
            MaintenanceKind::ColdMigration => "cold_migration",
            MaintenanceKind::LiveMigration => "live_migration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintenance {
    #[serde(rename = "type")]
    pub kind: MaintenanceKind,
    pub when: DateTime<Utc>,
}

/// A virtual machine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: u64,
    pub label: String,
    pub region: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub maintenance: Option<Maintenance>,
}

impl RequiresVisibility for Instance {
    fn requires_visibility(&self) -> bool {
        self.maintenance.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    pub label: String,
    pub region: String,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleMaintenanceRequest {
    #[serde(rename = "type")]
    pub kind: MaintenanceKind,
    pub when: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceOrderBy {
    #[default]
    Label,
    Status,
    Region,
    Created,
}

impl InstanceOrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceOrderBy::Label => "label",
            InstanceOrderBy::Status => "status",
            InstanceOrderBy::Region => "region",
            InstanceOrderBy::Created => "created",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    List,
    Grid,
}

impl DisplayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::List => "list",
            DisplayMode::Grid => "grid",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::List => DisplayMode::Grid,
            DisplayMode::Grid => DisplayMode::List,
        }
    }
}

/// Query params for instance listings. `page` and `page_size` stay raw
/// strings: they come from the address bar and are corrected, not rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListInstancesQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    #[serde(default)]
    pub order_by: InstanceOrderBy,
    #[serde(default)]
    pub order: Order,
    #[serde(default)]
    pub view: DisplayMode,
    /// Render the page under tag headings.
    #[serde(default)]
    pub group: bool,
}

#[derive(Debug, Serialize)]
pub struct ListInstancesResponse {
    pub data: Vec<Instance>,
    pub page: usize,
    pub page_size: PageSize,
    pub configured_page_size: PageSize,
    pub total: usize,
    pub total_pages: usize,
    pub some_have_maintenance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_page: Option<usize>,
}

impl ListInstancesResponse {
    pub fn new(instances: &[Instance], state: &PaginationState) -> Self {
        Self {
            data: state.slice(instances).to_vec(),
            page: state.page,
            page_size: state.page_size,
            configured_page_size: state.configured_page_size,
            total: state.total,
            total_pages: state.total_pages,
            some_have_maintenance: instances.iter().any(|i| i.requires_visibility()),
            canonical_page: state.canonical_page(),
        }
    }
}
