//! Page sizing and page clamping for console list views.
//!
//! The effective page size is only ever enlarged relative to the configured
//! one, so that every item flagged as requiring visibility fits on a single
//! page. Requested page numbers come from untrusted query strings and are
//! corrected rather than rejected.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// A record that may need to be visible on the first rendered page.
pub trait RequiresVisibility {
    fn requires_visibility(&self) -> bool;
}

// ─── Page Size ───────────────────────────────────────────────────

/// Number of rows per page. `All` sorts after every fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageSize {
    Fixed(usize),
    All,
}

impl PageSize {
    /// Rows per page for a collection of `total` items. Never zero.
    pub fn resolve(self, total: usize) -> usize {
        match self {
            PageSize::Fixed(n) => n.max(1),
            PageSize::All => total.max(1),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Fixed(n) => write!(f, "{}", n),
            PageSize::All => f.write_str("all"),
        }
    }
}

impl FromStr for PageSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageSize::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(PageSize::Fixed(n)),
            _ => Err(AppError::InvalidPageSize(s.to_string())),
        }
    }
}

impl Serialize for PageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageSize::Fixed(n) => serializer.serialize_u64(*n as u64),
            PageSize::All => serializer.serialize_str("all"),
        }
    }
}

impl<'de> Deserialize<'de> for PageSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(usize),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(0) => Err(serde::de::Error::custom("page size must be positive")),
            Raw::Number(n) => Ok(PageSize::Fixed(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ─── Tiers ───────────────────────────────────────────────────────

pub const DEFAULT_TIERS: [usize; 4] = [25, 50, 75, 100];

/// Ascending list of the fixed page sizes a list view offers.
/// `PageSize::All` is always the implicit last tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSizeTiers {
    sizes: Vec<usize>,
}

impl PageSizeTiers {
    pub fn new(sizes: Vec<usize>) -> Result<Self, AppError> {
        if sizes.is_empty() {
            return Err(AppError::InvalidPageSize("no page size tiers configured".to_string()));
        }
        if sizes.iter().any(|&n| n == 0) {
            return Err(AppError::InvalidPageSize("page size tiers must be positive".to_string()));
        }
        if sizes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::InvalidPageSize(
                "page size tiers must be strictly ascending".to_string(),
            ));
        }
        Ok(Self { sizes })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn contains(&self, size: PageSize) -> bool {
        match size {
            PageSize::Fixed(n) => self.sizes.contains(&n),
            PageSize::All => true,
        }
    }

    /// Smallest tier that holds `count` rows, or `All` if none does.
    pub fn minimum_for(&self, count: usize) -> PageSize {
        self.sizes
            .iter()
            .copied()
            .find(|&n| n >= count)
            .map(PageSize::Fixed)
            .unwrap_or(PageSize::All)
    }

    /// Interpret a `page_size` query value, falling back to `default` for
    /// anything missing, malformed or not offered as a tier.
    pub fn parse_or(&self, raw: Option<&str>, default: PageSize) -> PageSize {
        let Some(raw) = raw else {
            return default;
        };
        match raw.parse::<PageSize>() {
            Ok(size) if self.contains(size) => size,
            _ => {
                tracing::debug!("Ignoring unsupported page size {:?}, using {}", raw, default);
                default
            }
        }
    }
}

impl Default for PageSizeTiers {
    fn default() -> Self {
        Self { sizes: DEFAULT_TIERS.to_vec() }
    }
}

// ─── Policy ──────────────────────────────────────────────────────

pub fn count_requiring_visibility<T: RequiresVisibility>(items: &[T]) -> usize {
    items.iter().filter(|item| item.requires_visibility()).count()
}

/// Page size large enough that every flagged item fits on one page.
pub fn compute_effective_page_size<T: RequiresVisibility>(
    items: &[T],
    configured: PageSize,
    tiers: &PageSizeTiers,
) -> PageSize {
    effective_page_size_for(count_requiring_visibility(items), configured, tiers)
}

pub fn effective_page_size_for(must_show: usize, configured: PageSize, tiers: &PageSizeTiers) -> PageSize {
    if PageSize::Fixed(must_show) <= configured {
        configured
    } else {
        // Every tier >= must_show is also > configured here.
        tiers.minimum_for(must_show)
    }
}

pub fn max_page(total_count: usize, page_size: PageSize) -> usize {
    total_count.div_ceil(page_size.resolve(total_count)).max(1)
}

/// Correct an untrusted 1-indexed page number into `[1, max_page]`.
pub fn clamp_requested_page(requested: Option<&str>, total_count: usize, page_size: PageSize) -> usize {
    let max = max_page(total_count, page_size);
    let Some(raw) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return 1;
    };

    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }

    match digits.parse::<usize>() {
        Ok(0) => 1,
        Ok(page) => page.min(max),
        // All digits but too large to hold: out of range, not malformed.
        Err(_) if digits.bytes().any(|b| b != b'0') => max,
        Err(_) => 1,
    }
}

// ─── State ───────────────────────────────────────────────────────

/// Everything a list view needs to render one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    pub requested_page: Option<String>,
    pub configured_page_size: PageSize,
    pub page_size: PageSize,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl PaginationState {
    pub fn compute<T: RequiresVisibility>(
        items: &[T],
        configured: PageSize,
        requested_page: Option<&str>,
        tiers: &PageSizeTiers,
    ) -> Self {
        let page_size = compute_effective_page_size(items, configured, tiers);
        let total = items.len();
        Self {
            requested_page: requested_page.map(str::to_string),
            configured_page_size: configured,
            page_size,
            total,
            page: clamp_requested_page(requested_page, total, page_size),
            total_pages: max_page(total, page_size),
        }
    }

    /// Index range of the current page within the full collection.
    pub fn range(&self) -> Range<usize> {
        let size = self.page_size.resolve(self.total);
        let start = ((self.page - 1) * size).min(self.total);
        let end = (start + size).min(self.total);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range()]
    }

    /// The corrected page when it disagrees with what was asked for, so the
    /// caller can rewrite its URL. A missing page parameter needs no rewrite.
    pub fn canonical_page(&self) -> Option<usize> {
        match self.requested_page.as_deref() {
            None => None,
            Some(raw) if raw.trim() == self.page.to_string() => None,
            Some(_) => Some(self.page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Row(bool);

    impl RequiresVisibility for Row {
        fn requires_visibility(&self) -> bool {
            self.0
        }
    }

    fn rows(total: usize, flagged: usize) -> Vec<Row> {
        (0..total).map(|i| Row(i < flagged)).collect()
    }

    #[test]
    fn no_flagged_items_keeps_configured_size() {
        let tiers = PageSizeTiers::default();
        assert_eq!(compute_effective_page_size(&rows(200, 0), PageSize::Fixed(25), &tiers), PageSize::Fixed(25));
    }

    #[test]
    fn empty_collection_keeps_configured_size() {
        let tiers = PageSizeTiers::default();
        let empty: Vec<Row> = Vec::new();
        assert_eq!(compute_effective_page_size(&empty, PageSize::Fixed(75), &tiers), PageSize::Fixed(75));
        assert_eq!(compute_effective_page_size(&empty, PageSize::All, &tiers), PageSize::All);
    }

    #[test]
    fn flagged_overflow_picks_next_tier() {
        let tiers = PageSizeTiers::default();
        assert_eq!(compute_effective_page_size(&rows(120, 30), PageSize::Fixed(25), &tiers), PageSize::Fixed(50));
        assert_eq!(compute_effective_page_size(&rows(120, 50), PageSize::Fixed(25), &tiers), PageSize::Fixed(50));
        assert_eq!(compute_effective_page_size(&rows(120, 51), PageSize::Fixed(25), &tiers), PageSize::Fixed(75));
    }

    #[test]
    fn flagged_beyond_largest_tier_shows_all() {
        let tiers = PageSizeTiers::default();
        let items = rows(300, 101);
        let size = compute_effective_page_size(&items, PageSize::Fixed(100), &tiers);
        assert_eq!(size, PageSize::All);
        assert_eq!(size.resolve(items.len()), 300);
    }

    #[test]
    fn flagged_within_configured_size_keeps_it() {
        let tiers = PageSizeTiers::default();
        assert_eq!(compute_effective_page_size(&rows(120, 40), PageSize::Fixed(50), &tiers), PageSize::Fixed(50));
    }

    #[test]
    fn clamps_malformed_requests_to_first_page() {
        for raw in ["abc", "", "  ", "0", "-3", "2.5", "1e3", "+", "NaN"] {
            assert_eq!(clamp_requested_page(Some(raw), 120, PageSize::Fixed(25)), 1, "{:?}", raw);
        }
        assert_eq!(clamp_requested_page(None, 120, PageSize::Fixed(25)), 1);
    }

    #[test]
    fn clamps_out_of_range_to_last_page() {
        assert_eq!(clamp_requested_page(Some("99"), 120, PageSize::Fixed(25)), 5);
        assert_eq!(clamp_requested_page(Some("99999999999999999999999999"), 120, PageSize::Fixed(25)), 5);
        assert_eq!(clamp_requested_page(Some(" 3 "), 120, PageSize::Fixed(25)), 3);
        assert_eq!(clamp_requested_page(Some("+2"), 120, PageSize::Fixed(25)), 2);
    }

    #[test]
    fn empty_collection_has_one_page() {
        assert_eq!(max_page(0, PageSize::Fixed(25)), 1);
        assert_eq!(max_page(0, PageSize::All), 1);
        assert_eq!(clamp_requested_page(Some("7"), 0, PageSize::Fixed(25)), 1);
        assert_eq!(clamp_requested_page(Some("7"), 0, PageSize::All), 1);
    }

    #[test]
    fn state_slices_the_current_page() {
        let items = rows(60, 0);
        let state = PaginationState::compute(&items, PageSize::Fixed(25), Some("3"), &PageSizeTiers::default());
        assert_eq!(state.total_pages, 3);
        assert_eq!(state.page, 3);
        assert_eq!(state.range(), 50..60);
        assert_eq!(state.slice(&items).len(), 10);
        assert_eq!(state.canonical_page(), None);
    }

    #[test]
    fn state_reports_corrected_page() {
        let items = rows(60, 0);
        let tiers = PageSizeTiers::default();
        let state = PaginationState::compute(&items, PageSize::Fixed(25), Some("9"), &tiers);
        assert_eq!(state.canonical_page(), Some(3));

        let state = PaginationState::compute(&items, PageSize::Fixed(25), None, &tiers);
        assert_eq!(state.page, 1);
        assert_eq!(state.canonical_page(), None);
    }

    #[test]
    fn enlarged_page_size_shrinks_page_count() {
        let items = rows(120, 30);
        let state = PaginationState::compute(&items, PageSize::Fixed(25), Some("5"), &PageSizeTiers::default());
        assert_eq!(state.page_size, PageSize::Fixed(50));
        assert_eq!(state.total_pages, 3);
        assert_eq!(state.page, 3);
        assert_eq!(state.canonical_page(), Some(3));
    }

    #[test]
    fn tiers_reject_bad_configuration() {
        assert!(PageSizeTiers::new(vec![]).is_err());
        assert!(PageSizeTiers::new(vec![0, 10]).is_err());
        assert!(PageSizeTiers::new(vec![50, 25]).is_err());
        assert!(PageSizeTiers::new(vec![10, 20, 40]).is_ok());
    }

    #[test]
    fn custom_tiers_extend_the_policy() {
        let tiers = PageSizeTiers::new(vec![10, 20, 40, 80, 160]).unwrap();
        assert_eq!(effective_page_size_for(90, PageSize::Fixed(10), &tiers), PageSize::Fixed(160));
    }

    #[test]
    fn parses_page_size_query_values() {
        let tiers = PageSizeTiers::default();
        let default = PageSize::Fixed(25);
        assert_eq!(tiers.parse_or(Some("75"), default), PageSize::Fixed(75));
        assert_eq!(tiers.parse_or(Some("ALL"), default), PageSize::All);
        assert_eq!(tiers.parse_or(Some("33"), default), default);
        assert_eq!(tiers.parse_or(Some("lots"), default), default);
        assert_eq!(tiers.parse_or(None, default), default);
    }

    #[test]
    fn page_size_serializes_as_number_or_all() {
        assert_eq!(serde_json::to_string(&PageSize::Fixed(50)).unwrap(), "50");
        assert_eq!(serde_json::to_string(&PageSize::All).unwrap(), "\"all\"");
        assert_eq!(serde_json::from_str::<PageSize>("\"all\"").unwrap(), PageSize::All);
        assert_eq!(serde_json::from_str::<PageSize>("100").unwrap(), PageSize::Fixed(100));
        assert!(serde_json::from_str::<PageSize>("0").is_err());
    }

    fn page_size_strategy() -> impl Strategy<Value = PageSize> {
        prop_oneof![
            (1usize..=200).prop_map(PageSize::Fixed),
            Just(PageSize::All),
        ]
    }

    proptest! {
        #[test]
        fn effective_size_never_shrinks(must_show in 0usize..500, configured in page_size_strategy()) {
            let size = effective_page_size_for(must_show, configured, &PageSizeTiers::default());
            prop_assert!(size >= configured);
            prop_assert!(size >= PageSize::Fixed(must_show));
        }

        #[test]
        fn effective_size_is_monotonic(a in 0usize..500, b in 0usize..500, configured in page_size_strategy()) {
            let tiers = PageSizeTiers::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                effective_page_size_for(lo, configured, &tiers) <= effective_page_size_for(hi, configured, &tiers)
            );
        }

        #[test]
        fn clamped_page_is_in_range(raw in ".{0,12}", total in 0usize..2000, size in page_size_strategy()) {
            let page = clamp_requested_page(Some(&raw), total, size);
            prop_assert!(page >= 1);
            prop_assert!(page <= max_page(total, size));
        }

        #[test]
        fn numeric_pages_are_in_range(requested in any::<u64>(), total in 0usize..2000, size in page_size_strategy()) {
            let page = clamp_requested_page(Some(&requested.to_string()), total, size);
            prop_assert!(page >= 1 && page <= max_page(total, size));
        }

        #[test]
        fn clamping_is_idempotent(raw in "[-+]?[0-9]{0,25}|[a-z]{1,4}", total in 0usize..2000, size in page_size_strategy()) {
            let once = clamp_requested_page(Some(&raw), total, size);
            let twice = clamp_requested_page(Some(&once.to_string()), total, size);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn flagged_items_fit_on_one_page(total in 0usize..400, flagged in 0usize..400, configured in page_size_strategy()) {
            let flagged = flagged.min(total);
            let items = rows(total, flagged);
            let size = compute_effective_page_size(&items, configured, &PageSizeTiers::default());
            prop_assert!(size.resolve(total) >= flagged);
        }
    }
}
