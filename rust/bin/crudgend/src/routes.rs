//! Route registration for the generator API.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crudgen_codegen::{ColumnInfo, GenerationRequest, TableInfo};
use crudgen_engine::{GenError, Generator, HistoryPage, RollbackReport, RollbackRequest};
use crudgen_history::HistoryRecord;
use crudgen_schema::SchemaCatalog;

use crate::error::ApiError;

/// Application shared state.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
}

pub fn build_router(state: AppState) -> Router {
    let codegen = Router::new()
        .route("/generate", post(generate))
        .route("/history", get(list_history))
        .route("/history/{id}", get(get_history).delete(delete_history))
        .route("/rollback", post(rollback))
        .route("/tables", get(list_tables))
        .route("/columns", get(list_columns))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/codegen", codegen)
}

/// Run a generator call off the async runtime.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Generator) -> Result<T, GenError> + Send + 'static,
{
    let generator = Arc::clone(&state.generator);
    let result = tokio::task::spawn_blocking(move || f(&generator))
        .await
        .map_err(|e| GenError::Storage(format!("worker failed: {}", e)))?;
    Ok(result?)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<HistoryRecord>, ApiError> {
    let record = blocking(&state, move |g| g.generate(&request)).await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    #[serde(default)]
    page: usize,
    #[serde(default)]
    page_size: usize,
}

async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let page = blocking(&state, move |g| g.history(query.page, query.page_size)).await?;
    Ok(Json(page))
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<HistoryRecord>, ApiError> {
    let record = blocking(&state, move |g| g.history_record(id)).await?;
    Ok(Json(record))
}

async fn delete_history(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    blocking(&state, move |g| g.delete_history(id)).await?;
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}

async fn rollback(
    State(state): State<AppState>,
    Json(request): Json<RollbackRequest>,
) -> Result<Json<RollbackReport>, ApiError> {
    let report = blocking(&state, move |g| g.rollback(request.id, &request.flags)).await?;
    Ok(Json(report))
}

async fn list_tables(State(state): State<AppState>) -> Result<Json<Vec<TableInfo>>, ApiError> {
    let tables = blocking(&state, |g| Ok(catalog(g)?.list_tables()?)).await?;
    Ok(Json(tables))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnsQuery {
    table_name: String,
}

async fn list_columns(
    State(state): State<AppState>,
    Query(query): Query<ColumnsQuery>,
) -> Result<Json<Vec<ColumnInfo>>, ApiError> {
    let columns = blocking(&state, move |g| {
        Ok(catalog(g)?.list_columns(&query.table_name)?)
    })
    .await?;
    Ok(Json(columns))
}

fn catalog(g: &Generator) -> Result<&Arc<dyn SchemaCatalog>, GenError> {
    g.catalog()
        .ok_or_else(|| GenError::NotFound("no database configured".to_string()))
}
