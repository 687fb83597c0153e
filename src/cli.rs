use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};

use crate::bucket_details::{format_date, BucketDetails, DrawerOptions};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    AccessUpdate, AclType, CreateInstanceRequest, EndpointType, InstanceOrderBy, InstanceStatus,
    Maintenance, MaintenanceKind, Order,
};
use crate::pagination::PaginationState;
use crate::storage::human_readable_size;
use crate::AppState;

#[derive(Parser)]
#[command(
    name = "cloudshelf",
    about = "CloudShelf — local cloud console for buckets and instances",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory for bucket and instance records
    #[arg(long, global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server and console
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value = "3210")]
        port: u16,
    },

    /// Create a new bucket
    #[command(visible_alias = "mb")]
    MakeBucket {
        /// Label of the bucket to create
        label: String,
        /// Cluster to place the bucket in
        #[arg(short, long, default_value = "local-1")]
        cluster: String,
        /// Endpoint type (E0-E3)
        #[arg(short, long, value_parser = parse_endpoint_type)]
        endpoint_type: Option<EndpointType>,
    },

    /// Remove a bucket (must be empty)
    #[command(visible_alias = "rb")]
    RemoveBucket {
        label: String,
        #[arg(short, long, default_value = "local-1")]
        cluster: String,
    },

    /// List buckets
    #[command(visible_alias = "ls")]
    List,

    /// Show the details drawer for a bucket
    Info {
        label: String,
        #[arg(short, long, default_value = "local-1")]
        cluster: String,
    },

    /// Show or change a bucket's ACL and CORS setting
    Access {
        label: String,
        #[arg(short, long, default_value = "local-1")]
        cluster: String,
        /// New ACL (private, public-read, authenticated-read, public-read-write)
        #[arg(long)]
        acl: Option<AclType>,
        /// Enable or disable CORS
        #[arg(long)]
        cors: Option<bool>,
    },

    /// List instances, one page at a time
    Instances {
        /// Page to show (1-indexed)
        #[arg(long)]
        page: Option<String>,
        /// Rows per page: 25, 50, 75, 100 or all
        #[arg(long)]
        page_size: Option<String>,
        /// Sort by label, status, region or created
        #[arg(long, default_value = "label", value_parser = parse_order_by)]
        order_by: InstanceOrderBy,
        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Create an instance record
    AddInstance {
        label: String,
        #[arg(short, long, default_value = "local")]
        region: String,
        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Schedule or clear pending maintenance on an instance
    Maintenance {
        id: u64,
        /// reboot, cold_migration or live_migration
        #[arg(long, default_value = "reboot", value_parser = parse_maintenance_kind)]
        kind: MaintenanceKind,
        /// When the maintenance starts (RFC 3339); defaults to a week from now
        #[arg(long)]
        when: Option<DateTime<Utc>>,
        /// Clear maintenance instead of scheduling it
        #[arg(long)]
        clear: bool,
    },
}

fn parse_endpoint_type(s: &str) -> Result<EndpointType, String> {
    match s.to_ascii_uppercase().as_str() {
        "E0" => Ok(EndpointType::E0),
        "E1" => Ok(EndpointType::E1),
        "E2" => Ok(EndpointType::E2),
        "E3" => Ok(EndpointType::E3),
        _ => Err(format!("unknown endpoint type '{}'", s)),
    }
}

fn parse_order_by(s: &str) -> Result<InstanceOrderBy, String> {
    match s {
        "label" => Ok(InstanceOrderBy::Label),
        "status" => Ok(InstanceOrderBy::Status),
        "region" => Ok(InstanceOrderBy::Region),
        "created" => Ok(InstanceOrderBy::Created),
        _ => Err(format!("cannot sort by '{}'", s)),
    }
}

fn parse_maintenance_kind(s: &str) -> Result<MaintenanceKind, String> {
    match s {
        "reboot" => Ok(MaintenanceKind::Reboot),
        "cold_migration" => Ok(MaintenanceKind::ColdMigration),
        "live_migration" => Ok(MaintenanceKind::LiveMigration),
        _ => Err(format!("unknown maintenance type '{}'", s)),
    }
}

pub fn run_cli(command: Commands, config: Config) {
    let state = match AppState::open(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: Failed to open data directory: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(&state, command) {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn run_command(state: &AppState, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Serve { .. } => unreachable!("Serve is handled in main"),

        Commands::MakeBucket { label, cluster, endpoint_type } => {
            let bucket = state.storage.create_bucket(&label, &cluster, endpoint_type)?;
            println!("✓ Bucket '{}' created in {}", bucket.label, bucket.cluster);
            println!("  Hostname: {}", bucket.hostname);
            println!("  Created:  {}", format_date(&bucket.created, state.config.utc_offset));
        }

        Commands::RemoveBucket { label, cluster } => {
            state.storage.delete_bucket(&cluster, &label)?;
            println!("✓ Bucket '{}/{}' deleted", cluster, label);
        }

        Commands::List => {
            let buckets = state.storage.list_buckets()?;
            if buckets.is_empty() {
                println!("No buckets found. Create one with: cloudshelf make-bucket <label>");
                return Ok(());
            }
            println!("{:<30} {:<16} {:>8} {:>12}", "BUCKET", "CLUSTER", "OBJECTS", "SIZE");
            println!("{}", "─".repeat(70));
            for b in &buckets {
                println!(
                    "{:<30} {:<16} {:>8} {:>12}",
                    b.label,
                    b.cluster,
                    b.objects,
                    human_readable_size(b.size)
                );
            }
            println!("{}", "─".repeat(70));
            println!("{} bucket(s)", buckets.len());
        }

        Commands::Info { label, cluster } => {
            let bucket = state.storage.refresh_usage(&cluster, &label)?;
            let details = BucketDetails::build(&bucket, &state.catalog, DrawerOptions::from(&state.config));
            println!("{}", details);
        }

        Commands::Access { label, cluster, acl, cors } => {
            let current = state.storage.get_access(&cluster, &label)?;
            let access = if acl.is_some() || cors.is_some() {
                let update = AccessUpdate::new(acl.unwrap_or(current.acl), cors.unwrap_or(current.cors_enabled));
                state.storage.update_access(&cluster, &label, update)?
            } else {
                current
            };
            println!("ACL:  {}", access.acl.as_str());
            println!("CORS: {}", if access.cors_enabled { "enabled" } else { "disabled" });
        }

        Commands::Instances { page, page_size, order_by, desc } => {
            let order = if desc { Order::Desc } else { Order::Asc };
            let instances = state.instances.list(order_by, order)?;
            let tiers = &state.config.page_size_tiers;
            let configured = tiers.parse_or(page_size.as_deref(), state.config.default_page_size);
            let pagination = PaginationState::compute(&instances, configured, page.as_deref(), tiers);

            if instances.is_empty() {
                println!("No instances found. Create one with: cloudshelf add-instance <label>");
                return Ok(());
            }

            println!("{:>6}  {:<28} {:<14} {:<14} {}", "ID", "LABEL", "STATUS", "REGION", "MAINTENANCE");
            println!("{}", "─".repeat(90));
            for instance in pagination.slice(&instances) {
                let maintenance = instance
                    .maintenance
                    .as_ref()
                    .map(|m| format!("{} {}", m.kind.as_str(), format_date(&m.when, state.config.utc_offset)))
                    .unwrap_or_default();
                println!(
                    "{:>6}  {:<28} {:<14} {:<14} {}",
                    instance.id,
                    instance.label,
                    instance.status.as_str(),
                    instance.region,
                    maintenance
                );
            }
            println!("{}", "─".repeat(90));
            println!(
                "Page {} of {} · {} per page · {} instance(s)",
                pagination.page,
                pagination.total_pages,
                pagination.page_size,
                pagination.total
            );
            if pagination.page_size != configured {
                println!("  Page size raised from {} so every instance with maintenance is listed", configured);
            }
            if let (Some(requested), Some(_)) = (&page, pagination.canonical_page()) {
                println!("  Requested page '{}' is not available", requested);
            }
        }

        Commands::AddInstance { label, region, tags } => {
            let instance = state.instances.create(CreateInstanceRequest {
                label,
                region,
                status: InstanceStatus::Running,
                tags,
            })?;
            println!("✓ Instance {} '{}' created in {}", instance.id, instance.label, instance.region);
        }

        Commands::Maintenance { id, kind, when, clear } => {
            if clear {
                state.instances.set_maintenance(id, None)?;
                println!("✓ Cleared maintenance for instance {}", id);
            } else {
                let when = when.unwrap_or_else(|| Utc::now() + Duration::days(7));
                let instance = state.instances.set_maintenance(id, Some(Maintenance { kind, when }))?;
                println!(
                    "✓ Scheduled {} for '{}' at {}",
                    kind.as_str(),
                    instance.label,
                    format_date(&when, state.config.utc_offset)
                );
            }
        }
    }
    Ok(())
}
