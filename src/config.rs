use chrono::{FixedOffset, Offset, Utc};

use crate::pagination::{PageSize, PageSizeTiers};

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    /// Page size used by list views until the user picks another one
    pub default_page_size: PageSize,
    pub page_size_tiers: PageSizeTiers,
    /// Resolve bucket locations by region instead of by cluster
    pub multi_cluster: bool,
    /// Offset used when formatting timestamps for display
    pub utc_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        let page_size_tiers = std::env::var("CLOUDSHELF_PAGE_SIZES")
            .ok()
            .and_then(|v| parse_page_size_tiers(&v))
            .unwrap_or_default();
        Self {
            host: std::env::var("CLOUDSHELF_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("CLOUDSHELF_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3210),
            data_dir: std::env::var("CLOUDSHELF_DATA_DIR")
                .unwrap_or_else(|_| "./cloudshelf_data".to_string()),
            default_page_size: std::env::var("CLOUDSHELF_PAGE_SIZE")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|size| page_size_tiers.contains(*size))
                .unwrap_or(PageSize::Fixed(25)),
            page_size_tiers,
            multi_cluster: std::env::var("CLOUDSHELF_MULTI_CLUSTER")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            utc_offset: std::env::var("CLOUDSHELF_UTC_OFFSET")
                .ok()
                .and_then(|v| parse_utc_offset(&v))
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Parse a comma separated list such as `20,40,80`.
pub fn parse_page_size_tiers(raw: &str) -> Option<PageSizeTiers> {
    let sizes = raw
        .split(',')
        .map(|s| s.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    PageSizeTiers::new(sizes).ok()
}

/// Parse `+HH:MM`, `-HH:MM` or a plain number of hours.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.as_bytes().first()? {
        b'-' => (-1, &raw[1..]),
        b'+' => (1, &raw[1..]),
        _ => (1, raw),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (rest.parse::<i32>().ok()?, 0),
    };
    if !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_size_tiers() {
        assert_eq!(parse_page_size_tiers("20, 40,80").map(|t| t.sizes().to_vec()), Some(vec![20, 40, 80]));
        assert!(parse_page_size_tiers("40,20").is_none());
        assert!(parse_page_size_tiers("ten").is_none());
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_utc_offset("+05:30"), FixedOffset::east_opt(19800));
        assert_eq!(parse_utc_offset("-4"), FixedOffset::east_opt(-14400));
        assert_eq!(parse_utc_offset("0"), FixedOffset::east_opt(0));
        assert_eq!(parse_utc_offset("east"), None);
        assert_eq!(parse_utc_offset("+01:75"), None);
        assert_eq!(parse_utc_offset("+30"), None);
    }
}
