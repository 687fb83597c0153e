use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json,
};

use crate::bucket_details::{BucketDetails, DrawerOptions};
use crate::error::AppError;
use crate::models::*;
use crate::pagination::PaginationState;

use crate::AppState;

type AppResult<T> = Result<T, AppError>;

// ─── REST API Routes ─────────────────────────────────────────────

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Buckets
        .route("/buckets", get(list_buckets).post(create_bucket))
        .route("/buckets/:cluster/:label", get(get_bucket).delete(delete_bucket))
        .route("/buckets/:cluster/:label/details", get(get_bucket_details))
        .route("/buckets/:cluster/:label/access", get(get_bucket_access).put(update_bucket_access))
        // Instances
        .route("/instances", get(list_instances).post(create_instance))
        .route("/instances/:id", get(get_instance).delete(delete_instance))
        .route("/instances/:id/maintenance", put(schedule_maintenance).delete(clear_maintenance))
}

// ─── Bucket Handlers ─────────────────────────────────────────────

async fn list_buckets(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let data = state.storage.list_buckets()?;
    Ok(Json(ListBucketsResponse { results: data.len(), data }))
}

async fn create_bucket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBucketRequest>,
) -> AppResult<impl IntoResponse> {
    let bucket = state.storage.create_bucket(&body.label, &body.cluster, body.endpoint_type)?;
    Ok((StatusCode::CREATED, Json(bucket)))
}

async fn get_bucket(
    State(state): State<Arc<AppState>>,
    Path((cluster, label)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.storage.get_bucket(&cluster, &label)?))
}

async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    Path((cluster, label)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    state.storage.delete_bucket(&cluster, &label)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_bucket_details(
    State(state): State<Arc<AppState>>,
    Path((cluster, label)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let bucket = state.storage.get_bucket(&cluster, &label)?;
    Ok(Json(BucketDetails::build(&bucket, &state.catalog, DrawerOptions::from(&state.config))))
}

async fn get_bucket_access(
    State(state): State<Arc<AppState>>,
    Path((cluster, label)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.storage.get_access(&cluster, &label)?))
}

async fn update_bucket_access(
    State(state): State<Arc<AppState>>,
    Path((cluster, label)): Path<(String, String)>,
    Json(body): Json<BucketAccess>,
) -> AppResult<impl IntoResponse> {
    let update = AccessUpdate::new(body.acl, body.cors_enabled);
    Ok(Json(state.storage.update_access(&cluster, &label, update)?))
}

// ─── Instance Handlers ───────────────────────────────────────────

/// Order the instances and work out which page of them to show.
pub fn paginate_instances(
    state: &AppState,
    query: &ListInstancesQuery,
) -> AppResult<(Vec<Instance>, PaginationState)> {
    let instances = state.instances.list(query.order_by, query.order)?;
    let configured = state
        .config
        .page_size_tiers
        .parse_or(query.page_size.as_deref(), state.config.default_page_size);
    let pagination = PaginationState::compute(
        &instances,
        configured,
        query.page.as_deref(),
        &state.config.page_size_tiers,
    );
    if pagination.page_size != configured {
        tracing::debug!(
            "Page size raised from {} to {} to show all instances with maintenance",
            configured,
            pagination.page_size
        );
    }
    Ok((instances, pagination))
}

async fn list_instances(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListInstancesQuery>,
) -> AppResult<impl IntoResponse> {
    let (instances, pagination) = paginate_instances(&state, &query)?;
    Ok(Json(ListInstancesResponse::new(&instances, &pagination)))
}

async fn create_instance(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateInstanceRequest>,
) -> AppResult<impl IntoResponse> {
    let instance = state.instances.create(body)?;
    Ok((StatusCode::CREATED, Json(instance)))
}

async fn get_instance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.instances.get(id)?))
}

async fn delete_instance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<impl IntoResponse> {
    state.instances.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn schedule_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<ScheduleMaintenanceRequest>,
) -> AppResult<impl IntoResponse> {
    let maintenance = Maintenance { kind: body.kind, when: body.when };
    Ok(Json(state.instances.set_maintenance(id, Some(maintenance))?))
}

async fn clear_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.instances.set_maintenance(id, None)?))
}
