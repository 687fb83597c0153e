use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};

use crate::bucket_details::{format_date, BucketDetails, DrawerOptions, RateLimits};
use crate::error::AppError;
use crate::handlers::paginate_instances;
use crate::models::{Bucket, DisplayMode, Instance, ListInstancesQuery};
use crate::pagination::{PageSize, PaginationState};
use crate::storage::human_readable_size;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(buckets_page))
        .route("/buckets/:cluster/:label", get(bucket_drawer_page))
        .route("/instances", get(instances_page))
}

// ─── Pages ───────────────────────────────────────────────────────

async fn buckets_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let buckets = state.storage.list_buckets()?;
    Ok(Html(layout("Buckets", &render_bucket_table(&buckets))))
}

async fn bucket_drawer_page(
    State(state): State<Arc<AppState>>,
    Path((cluster, label)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
    let bucket = state.storage.get_bucket(&cluster, &label)?;
    let details = BucketDetails::build(&bucket, &state.catalog, DrawerOptions::from(&state.config));
    Ok(Html(layout(&details.title, &render_drawer(&details))))
}

async fn instances_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListInstancesQuery>,
) -> Result<Response, AppError> {
    let (instances, pagination) = paginate_instances(&state, &query)?;

    // Keep the address bar in step with the page actually rendered.
    if let Some(page) = pagination.canonical_page() {
        let target = instances_url(&query, page, pagination.configured_page_size);
        tracing::debug!("Redirecting instance list to {}", target);
        return Ok(Redirect::to(&target).into_response());
    }

    let view = InstanceView {
        query: &query,
        pagination: &pagination,
        rows: pagination.slice(&instances),
        some_have_maintenance: instances.iter().any(|i| i.maintenance.is_some()),
        utc_offset: state.config.utc_offset,
        page_size_options: state.config.page_size_tiers.sizes(),
    };
    Ok(Html(layout("Instances", &view.render())).into_response())
}

pub fn instances_url(query: &ListInstancesQuery, page: usize, page_size: PageSize) -> String {
    format!(
        "/instances?page={}&page_size={}&view={}&order_by={}&order={}&group={}",
        page,
        page_size,
        query.view.as_str(),
        query.order_by.as_str(),
        query.order.as_str(),
        query.group
    )
}

// ─── Rendering ───────────────────────────────────────────────────

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} · CloudShelf</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 0; background: #f4f5f6; color: #32363c; }}
        header {{ background: #32363c; color: #fff; padding: 14px 24px; display: flex; gap: 24px; }}
        header a {{ color: #fff; text-decoration: none; }}
        main {{ padding: 24px; }}
        table {{ width: 100%; border-collapse: collapse; background: #fff; }}
        th, td {{ text-align: left; padding: 10px 12px; border-bottom: 1px solid #e3e5e8; }}
        .control-header {{ display: flex; justify-content: flex-end; gap: 12px; margin-bottom: 28px; }}
        .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 16px; }}
        .card {{ background: #fff; padding: 16px; border-radius: 4px; }}
        .maintenance {{ color: #b85b00; font-weight: 600; }}
        .drawer {{ background: #fff; max-width: 480px; padding: 24px; }}
        .drawer hr {{ border: 0; border-top: 1px solid #e3e5e8; margin: 16px 0; }}
        .footer {{ display: flex; justify-content: space-between; margin-top: 16px; }}
        .pages a, .pages span {{ padding: 4px 10px; }}
        .pages .current {{ font-weight: 700; }}
    </style>
</head>
<body>
    <header><strong>CloudShelf</strong><a href="/">Buckets</a><a href="/instances">Instances</a></header>
    <main>
{body}
    </main>
</body>
</html>"##,
        title = escape(title),
        body = body
    )
}

fn render_bucket_table(buckets: &[Bucket]) -> String {
    if buckets.is_empty() {
        return "<p>No buckets found. Create one with: cloudshelf make-bucket &lt;label&gt; --cluster &lt;cluster&gt;</p>"
            .to_string();
    }
    let mut html = String::from(
        "<table>\n<thead><tr><th>Name</th><th>Cluster</th><th>Objects</th><th>Size</th></tr></thead>\n<tbody>\n",
    );
    for b in buckets {
        let _ = writeln!(
            html,
            r#"<tr><td><a href="/buckets/{cluster}/{label}">{label}</a></td><td>{cluster}</td><td>{objects}</td><td>{size}</td></tr>"#,
            cluster = escape(&b.cluster),
            label = escape(&b.label),
            objects = b.objects,
            size = human_readable_size(b.size),
        );
    }
    html.push_str("</tbody>\n</table>");
    html
}

fn render_drawer(details: &BucketDetails) -> String {
    let mut html = format!("<section class=\"drawer\">\n<h2>{}</h2>\n", escape(&details.title));

    let _ = writeln!(html, r#"<p data-testid="createdTime">Created: {}</p>"#, escape(&details.created));
    if let Some(endpoint_type) = details.endpoint_type {
        let _ = writeln!(html, r#"<p data-testid="endpointType">Endpoint Type: {}</p>"#, endpoint_type);
    }
    if let Some(region) = &details.region_label {
        let _ = writeln!(html, r#"<p data-testid="cluster">{}</p>"#, escape(region));
    }
    if let (Some(url), Some(display)) = (&details.hostname_url, &details.hostname_display) {
        let _ = writeln!(html, r#"<p><a href="{}" rel="noopener">{}</a></p>"#, escape(url), escape(display));
    }
    html.push_str("<hr>\n");
    let _ = writeln!(html, "<p>{}</p>", escape(&details.size));
    let _ = writeln!(
        html,
        r#"<p><a href="{}">{}</a></p>"#,
        escape(&details.objects_url),
        escape(&details.objects)
    );
    html.push_str("<hr>\n<h3 data-testid=\"bucketRateLimit\">Bucket Rate Limits</h3>\n");

    match &details.rate_limits {
        RateLimits::Table { rows } => {
            html.push_str(
                "<table>\n<thead><tr><th>Limits</th><th>GET</th><th>PUT</th><th>LIST</th><th>DELETE</th><th>OTHER</th></tr></thead>\n<tbody>\n",
            );
            for row in rows {
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    row.limits, row.get, row.put, row.list, row.delete, row.other
                );
            }
            html.push_str("</tbody>\n</table>\n");
        }
        RateLimits::Baseline { requests_per_second } => {
            let _ = writeln!(
                html,
                "<p>This endpoint type supports up to {} Requests Per Second (RPS).</p>",
                requests_per_second
            );
        }
    }

    html.push_str("<hr>\n<h3>Access</h3>\n");
    let _ = writeln!(
        html,
        "<p>ACL: <code>{}</code> · CORS {}</p>",
        details.access.acl.as_str(),
        if details.access.cors_enabled { "enabled" } else { "disabled" }
    );
    html.push_str("</section>");
    html
}

struct InstanceView<'a> {
    query: &'a ListInstancesQuery,
    pagination: &'a PaginationState,
    rows: &'a [Instance],
    some_have_maintenance: bool,
    utc_offset: chrono::FixedOffset,
    page_size_options: &'a [usize],
}

impl InstanceView<'_> {
    fn render(&self) -> String {
        let mut html = self.render_controls();
        if self.query.group {
            for (tag, rows) in group_by_tag(self.rows) {
                let _ = writeln!(html, "<h2 class=\"tag-group\">{}</h2>", escape(tag));
                html.push_str(&self.render_rows(&rows));
            }
        } else {
            let rows: Vec<&Instance> = self.rows.iter().collect();
            html.push_str(&self.render_rows(&rows));
        }
        html.push_str(&self.render_footer());
        html
    }

    fn render_rows(&self, rows: &[&Instance]) -> String {
        match self.query.view {
            DisplayMode::List => self.render_table(rows),
            DisplayMode::Grid => self.render_grid(rows),
        }
    }

    fn url(&self, page: usize, page_size: PageSize, view: DisplayMode, group: bool) -> String {
        let query = ListInstancesQuery {
            page: None,
            page_size: None,
            order_by: self.query.order_by,
            order: self.query.order,
            view,
            group,
        };
        instances_url(&query, page, page_size)
    }

    fn render_controls(&self) -> String {
        let view = self.query.view;
        let group = self.query.group;
        let page = self.pagination.page;
        let page_size = self.pagination.configured_page_size;
        format!(
            "<div class=\"control-header\">\n<span class=\"visually-hidden\">group by tag is currently {grouped}</span>\n<a href=\"{group_toggle}\" aria-label=\"Toggle group by tag\">{group_label}</a>\n<span class=\"visually-hidden\">Currently in {current} view</span>\n<a href=\"{toggle}\" aria-label=\"Toggle display\">{label} view</a>\n</div>\n",
            grouped = if group { "enabled" } else { "disabled" },
            group_toggle = escape(&self.url(page, page_size, view, !group)),
            group_label = if group { "Ungroup" } else { "Group by tag" },
            current = view.as_str(),
            toggle = escape(&self.url(page, page_size, view.toggled(), group)),
            label = match view.toggled() {
                DisplayMode::List => "List",
                DisplayMode::Grid => "Grid",
            },
        )
    }

    fn maintenance_cell(&self, instance: &Instance) -> String {
        match &instance.maintenance {
            Some(m) => format!(
                "<span class=\"maintenance\">{} scheduled {}</span>",
                m.kind.as_str(),
                format_date(&m.when, self.utc_offset)
            ),
            None => "No impending maintenance".to_string(),
        }
    }

    fn render_table(&self, rows: &[&Instance]) -> String {
        let mut html = String::from("<table>\n<thead><tr><th>Label</th><th>Status</th><th>Region</th><th>Tags</th>");
        if self.some_have_maintenance {
            html.push_str("<th>Maintenance</th>");
        }
        html.push_str("</tr></thead>\n<tbody>\n");
        for &instance in rows {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
                escape(&instance.label),
                instance.status.as_str(),
                escape(&instance.region),
                escape(&instance.tags.join(", ")),
            );
            if self.some_have_maintenance {
                let _ = write!(html, "<td>{}</td>", self.maintenance_cell(instance));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
        html
    }

    fn render_grid(&self, rows: &[&Instance]) -> String {
        let mut html = String::from("<div class=\"grid\">\n");
        for &instance in rows {
            let _ = writeln!(
                html,
                "<div class=\"card\"><h3>{}</h3><p>{} · {}</p>{}</div>",
                escape(&instance.label),
                instance.status.as_str(),
                escape(&instance.region),
                if instance.maintenance.is_some() {
                    format!("<p>{}</p>", self.maintenance_cell(instance))
                } else {
                    String::new()
                },
            );
        }
        html.push_str("</div>\n");
        html
    }

    fn render_footer(&self) -> String {
        let p = self.pagination;
        let mut html = String::from("<div class=\"footer\">\n<div class=\"pages\">");
        if p.total_pages > 1 {
            for page in 1..=p.total_pages {
                if page == p.page {
                    let _ = write!(html, "<span class=\"current\">{}</span>", page);
                } else {
                    let href = self.url(page, p.configured_page_size, self.query.view, self.query.group);
                    let _ = write!(html, "<a href=\"{}\">{}</a>", escape(&href), page);
                }
            }
        }
        html.push_str("</div>\n<div class=\"sizes\">Show: ");
        // No "show all" option here; rendering every instance is too slow.
        for &size in self.page_size_options {
            let size = PageSize::Fixed(size);
            if size == p.page_size {
                let _ = write!(html, "<strong>{}</strong> ", size);
            } else {
                let href = self.url(1, size, self.query.view, self.query.group);
                let _ = write!(html, "<a href=\"{}\">{}</a> ", escape(&href), size);
            }
        }
        html.push_str("</div>\n</div>\n");
        html
    }
}

const UNTAGGED: &str = "No tags";

/// Tag headings in alphabetical order, untagged instances last. An instance
/// with several tags is listed under each of them.
fn group_by_tag(rows: &[Instance]) -> Vec<(&str, Vec<&Instance>)> {
    let mut groups: BTreeMap<&str, Vec<&Instance>> = BTreeMap::new();
    let mut untagged = Vec::new();
    for instance in rows {
        if instance.tags.is_empty() {
            untagged.push(instance);
        }
        for tag in &instance.tags {
            let group = groups.entry(tag.as_str()).or_default();
            if !group.iter().any(|i| i.id == instance.id) {
                group.push(instance);
            }
        }
    }
    let mut grouped: Vec<_> = groups.into_iter().collect();
    if !untagged.is_empty() {
        grouped.push((UNTAGGED, untagged));
    }
    grouped
}
