//! View model for the bucket details drawer.

use std::fmt;

use chrono::FixedOffset;
use serde::Serialize;

use crate::config::Config;
use crate::models::{Bucket, BucketAccess, EndpointType};
use crate::regions::Catalog;
use crate::storage::human_readable_size;

const DEFAULT_TITLE: &str = "Bucket Detail";
const TITLE_MAX_LEN: usize = 30;
const HOSTNAME_MAX_LEN: usize = 50;
const BASELINE_RPS: u32 = 750;

#[derive(Debug, Clone, Copy)]
pub struct DrawerOptions {
    pub multi_cluster: bool,
    pub utc_offset: FixedOffset,
}

impl From<&Config> for DrawerOptions {
    fn from(config: &Config) -> Self {
        Self {
            multi_cluster: config.multi_cluster,
            utc_offset: config.utc_offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitRow {
    pub limits: &'static str,
    pub get: u32,
    pub put: u32,
    pub list: u32,
    pub delete: u32,
    pub other: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateLimits {
    Table { rows: Vec<RateLimitRow> },
    Baseline { requests_per_second: u32 },
}

impl RateLimits {
    pub fn for_endpoint(endpoint_type: Option<EndpointType>) -> Self {
        match endpoint_type {
            Some(EndpointType::E2) => RateLimits::Table {
                rows: vec![RateLimitRow { limits: "Basic", get: 2_000, put: 500, list: 100, delete: 200, other: 400 }],
            },
            Some(EndpointType::E3) => RateLimits::Table {
                rows: vec![RateLimitRow { limits: "Basic", get: 20_000, put: 2_000, list: 400, delete: 400, other: 1_000 }],
            },
            _ => RateLimits::Baseline { requests_per_second: BASELINE_RPS },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketDetails {
    pub title: String,
    pub label: String,
    pub created: String,
    pub endpoint_type: Option<EndpointType>,
    pub region_label: Option<String>,
    pub hostname: Option<String>,
    pub hostname_display: Option<String>,
    pub hostname_url: Option<String>,
    pub size: String,
    pub objects: String,
    pub objects_url: String,
    pub rate_limits: RateLimits,
    pub access: BucketAccess,
}

impl BucketDetails {
    pub fn build(bucket: &Bucket, catalog: &Catalog, options: DrawerOptions) -> Self {
        let title = if bucket.label.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            truncate_middle(&bucket.label, TITLE_MAX_LEN)
        };

        let region_label = if options.multi_cluster {
            catalog.region(&bucket.region).map(|r| r.label.to_string())
        } else if bucket.cluster.is_empty() {
            None
        } else {
            Some(
                catalog
                    .region_for_cluster(&bucket.cluster)
                    .map(|r| r.label.to_string())
                    .unwrap_or_else(|| bucket.cluster.clone()),
            )
        };

        let hostname = Some(bucket.hostname.clone()).filter(|h| !h.is_empty());
        let location = if options.multi_cluster { &bucket.region } else { &bucket.cluster };

        Self {
            title,
            label: bucket.label.clone(),
            created: format_date(&bucket.created, options.utc_offset),
            endpoint_type: bucket.endpoint_type,
            region_label,
            hostname_display: hostname.as_deref().map(|h| truncate_middle(h, HOSTNAME_MAX_LEN)),
            hostname_url: hostname.as_deref().map(|h| format!("https://{}", h)),
            hostname,
            size: human_readable_size(bucket.size),
            objects: pluralize("object", "objects", bucket.objects),
            objects_url: format!("/object-storage/buckets/{}/{}", location, bucket.label),
            rate_limits: RateLimits::for_endpoint(bucket.endpoint_type),
            access: bucket.access,
        }
    }
}

impl fmt::Display for BucketDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "─".repeat(40))?;
        writeln!(f, "  Created:        {}", self.created)?;
        if let Some(endpoint_type) = self.endpoint_type {
            writeln!(f, "  Endpoint Type:  {}", endpoint_type)?;
        }
        if let Some(region) = &self.region_label {
            writeln!(f, "  Region:         {}", region)?;
        }
        if let Some(url) = &self.hostname_url {
            writeln!(f, "  Hostname:       {}", url)?;
        }
        writeln!(f, "  Size:           {}", self.size)?;
        writeln!(f, "  Objects:        {}", self.objects)?;
        writeln!(f)?;
        writeln!(f, "Bucket Rate Limits")?;
        match &self.rate_limits {
            RateLimits::Table { rows } => {
                writeln!(f, "  {:<8} {:>7} {:>7} {:>7} {:>7} {:>7}", "LIMITS", "GET", "PUT", "LIST", "DELETE", "OTHER")?;
                for row in rows {
                    writeln!(
                        f,
                        "  {:<8} {:>7} {:>7} {:>7} {:>7} {:>7}",
                        row.limits, row.get, row.put, row.list, row.delete, row.other
                    )?;
                }
            }
            RateLimits::Baseline { requests_per_second } => {
                writeln!(f, "  This endpoint type supports up to {} Requests Per Second (RPS).", requests_per_second)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "  ACL:            {}", self.access.acl.as_str())?;
        write!(f, "  CORS:           {}", if self.access.cors_enabled { "enabled" } else { "disabled" })
    }
}

pub fn format_date(date: &chrono::DateTime<chrono::Utc>, offset: FixedOffset) -> String {
    date.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string()
}

/// `"1 object"`, `"0 objects"`, `"12 objects"`.
pub fn pluralize(singular: &str, plural: &str, count: u64) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Shorten `s` to at most `max_len` characters by replacing its middle with
/// an ellipsis, keeping both ends readable.
pub fn truncate_middle(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len || max_len < 3 {
        return s.to_string();
    }
    let keep = max_len - 1;
    let head = keep.div_ceil(2);
    let tail = keep - head;
    let mut out: String = chars[..head].iter().collect();
    out.push('…');
    out.extend(&chars[chars.len() - tail..]);
    out
}
