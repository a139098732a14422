//! JSON API handlers.
//!
//! Handlers stay thin: parse, validate, hit the store, shape the response.
//! Filtering/sorting/stats all go through query.rs on the in-memory list.

use crate::models::{
    BulkDeleteRequest, BulkUpdateRequest, Category, CategoryResponse, CreateCategoryRequest,
    CreateTagRequest, CreateTodoRequest, Tag, Todo, TodoResponse, TodoTimes, UpdateCategoryRequest,
    UpdateTodoRequest,
};
use crate::query::{self, SortKey, SortOrder, Stats, TodoFilter};
use crate::store::{Store, StoreError};
use crate::timefmt;
use crate::validate::{sanitize_text, validate_content, validate_tags, ValidationError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

// ── Shared state ───────────────────────────────────────────────

pub struct AppState {
    pub store: Store,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route(
            "/api/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/api/todos/:id/complete", post(complete_todo))
        .route("/api/todos/:id/uncomplete", post(uncomplete_todo))
        .route("/api/todos/bulk_update", post(bulk_update))
        .route("/api/todos/bulk_delete", post(bulk_delete))
        .route("/api/stats", get(stats))
        .route("/api/times", get(times))
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/api/tags", get(list_tags).post(create_tag))
        .route("/api/tags/:id", delete(delete_tag))
        .with_state(state)
}

// ── Error mapping ──────────────────────────────────────────────

type ApiError = (StatusCode, String);

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NameTaken(_) | StoreError::CategoryInUse(_) | StoreError::TagInUse(_) => {
            (StatusCode::CONFLICT, e.to_string())
        }
        _ => {
            tracing::error!(error = %e, "store operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn bad_request(e: ValidationError) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn not_found(what: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

// ── Query-string parsing ───────────────────────────────────────

/// Raw list parameters. Everything is a string here; values we don't
/// recognize are dropped during conversion rather than rejected, so newer
/// clients can send vocabulary we don't know yet.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ListParams {
    pub completed: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub overdue: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

pub fn build_query(params: &ListParams) -> (TodoFilter, Option<SortKey>, SortOrder) {
    let completed = match params.completed.as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    };

    let filter = TodoFilter {
        completed,
        priority: params
            .priority
            .as_deref()
            .and_then(crate::models::Priority::parse),
        category: params.category.clone().filter(|s| !s.is_empty()),
        tag: params.tag.clone().filter(|s| !s.is_empty()),
        overdue: params.overdue.as_deref() == Some("true"),
        created_from: params.date_from.as_deref().and_then(timefmt::parse_datetime),
        created_to: params.date_to.as_deref().and_then(timefmt::parse_datetime),
    };

    let sort_key = params.sort_by.as_deref().and_then(SortKey::parse);
    let order = params
        .order
        .as_deref()
        .map(SortOrder::parse)
        .unwrap_or_default();

    (filter, sort_key, order)
}

// ── Todo handlers ──────────────────────────────────────────────

// GET /api/todos
pub async fn list_todos(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let now = Utc::now();
    let todos = state.store.list_todos().map_err(store_error)?;

    let (filter, sort_key, order) = build_query(&params);
    let mut todos = query::filter_todos(todos, &filter, now);
    query::sort_todos(&mut todos, sort_key, order);

    let responses = todos
        .into_iter()
        .map(|t| TodoResponse::from_todo(t, now))
        .collect();
    Ok(Json(responses))
}

// POST /api/todos
pub async fn create_todo(
    State(state): State<SharedState>,
    Json(payload): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let content = validate_content(&payload.content).map_err(bad_request)?;
    let tags = validate_tags(&payload.tags).map_err(bad_request)?;
    let notes = payload
        .notes
        .as_deref()
        .map(sanitize_text)
        .filter(|s| !s.is_empty());

    let due_date = parse_due_date(payload.due_date.as_deref()).map_err(bad_request)?;

    let now = Utc::now();
    let todo = Todo {
        id: 0, // assigned by the store
        content,
        completed: false,
        priority: payload.priority,
        created_at: now,
        completed_at: None,
        due_date,
        category: payload.category.filter(|s| !s.trim().is_empty()),
        tags,
        notes,
        estimated_time: payload.estimated_time,
        actual_time: None,
    };

    let todo = state.store.create_todo(todo).map_err(store_error)?;
    tracing::info!(id = todo.id, "todo created");

    Ok((
        StatusCode::CREATED,
        Json(TodoResponse::from_todo(todo, now)),
    ))
}

// GET /api/todos/:id
pub async fn get_todo(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state
        .store
        .get_todo(id)
        .map_err(store_error)?
        .ok_or_else(|| not_found("todo"))?;
    Ok(Json(TodoResponse::from_todo(todo, Utc::now())))
}

/// Body due dates go through the same lenient parser as query strings.
/// None or an empty string means no due date; anything unparseable is an
/// error rather than silently dropped.
fn parse_due_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => timefmt::parse_datetime(s)
            .map(Some)
            .ok_or_else(|| ValidationError::InvalidDueDate(s.to_string())),
    }
}

/// Merge an update payload into a stored todo. Fields the client didn't
/// send stay as they are; `created_at`, `completed` and `completed_at` are
/// never touched here — completion only moves through the toggle handlers.
fn apply_update(todo: &mut Todo, payload: UpdateTodoRequest) -> Result<(), ValidationError> {
    if let Some(content) = payload.content {
        todo.content = validate_content(&content)?;
    }
    if let Some(priority) = payload.priority {
        todo.priority = priority;
    }
    if let Some(due_date) = payload.due_date {
        // Outer Some means the field was present; an inner null clears it.
        todo.due_date = parse_due_date(due_date.as_deref())?;
    }
    if let Some(category) = payload.category {
        todo.category = if category.trim().is_empty() {
            None
        } else {
            Some(category)
        };
    }
    if let Some(tags) = payload.tags {
        todo.tags = validate_tags(&tags)?;
    }
    if let Some(notes) = payload.notes {
        let notes = sanitize_text(&notes);
        todo.notes = if notes.is_empty() { None } else { Some(notes) };
    }
    if let Some(estimated_time) = payload.estimated_time {
        todo.estimated_time = Some(estimated_time);
    }
    if let Some(actual_time) = payload.actual_time {
        todo.actual_time = Some(actual_time);
    }
    Ok(())
}

// PUT /api/todos/:id
pub async fn update_todo(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, ApiError> {
    let mut todo = state
        .store
        .get_todo(id)
        .map_err(store_error)?
        .ok_or_else(|| not_found("todo"))?;

    apply_update(&mut todo, payload).map_err(bad_request)?;
    state.store.update_todo(&todo).map_err(store_error)?;
    tracing::info!(id, "todo updated");

    Ok(Json(TodoResponse::from_todo(todo, Utc::now())))
}

// DELETE /api/todos/:id
pub async fn delete_todo(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.store.delete_todo(id).map_err(store_error)?;
    if !deleted {
        return Err(not_found("todo"));
    }
    tracing::info!(id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/todos/:id/complete
pub async fn complete_todo(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<TodoResponse>, ApiError> {
    set_completed(&state, id, true)
}

// POST /api/todos/:id/uncomplete
pub async fn uncomplete_todo(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<TodoResponse>, ApiError> {
    set_completed(&state, id, false)
}

/// The completion flag and its timestamp move together: Some(now) on
/// completion, None when reopened.
fn set_completed(
    state: &SharedState,
    id: u64,
    completed: bool,
) -> Result<Json<TodoResponse>, ApiError> {
    let mut todo = state
        .store
        .get_todo(id)
        .map_err(store_error)?
        .ok_or_else(|| not_found("todo"))?;

    let now = Utc::now();
    todo.completed = completed;
    todo.completed_at = if completed { Some(now) } else { None };

    state.store.update_todo(&todo).map_err(store_error)?;
    tracing::info!(id, completed, "todo completion toggled");

    Ok(Json(TodoResponse::from_todo(todo, now)))
}

// POST /api/todos/bulk_update
pub async fn bulk_update(
    State(state): State<SharedState>,
    Json(payload): Json<BulkUpdateRequest>,
) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let now = Utc::now();
    let mut updated = Vec::with_capacity(payload.ids.len());

    for id in payload.ids {
        let mut todo = state
            .store
            .get_todo(id)
            .map_err(store_error)?
            .ok_or_else(|| not_found("todo"))?;

        apply_update(&mut todo, payload.updates.clone()).map_err(bad_request)?;
        state.store.update_todo(&todo).map_err(store_error)?;
        updated.push(TodoResponse::from_todo(todo, now));
    }

    tracing::info!(count = updated.len(), "bulk update applied");
    Ok(Json(updated))
}

// POST /api/todos/bulk_delete
pub async fn bulk_delete(
    State(state): State<SharedState>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut deleted = 0usize;
    for id in payload.ids {
        if state.store.delete_todo(id).map_err(store_error)? {
            deleted += 1;
        }
    }
    tracing::info!(deleted, "bulk delete applied");
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

// ── Statistics & times ─────────────────────────────────────────

// GET /api/stats
pub async fn stats(State(state): State<SharedState>) -> Result<Json<Stats>, ApiError> {
    let todos = state.store.list_todos().map_err(store_error)?;
    Ok(Json(query::compute_stats(&todos, Utc::now())))
}

// GET /api/times
pub async fn times(
    State(state): State<SharedState>,
) -> Result<Json<HashMap<u64, TodoTimes>>, ApiError> {
    let now = Utc::now();
    let todos = state.store.list_todos().map_err(store_error)?;

    let times = todos
        .into_iter()
        .map(|t| {
            (
                t.id,
                TodoTimes {
                    created_formatted: timefmt::format_datetime(t.created_at),
                    created_relative: timefmt::relative_time(t.created_at, now),
                    completed_formatted: t.completed_at.map(timefmt::format_datetime),
                    completed_relative: t.completed_at.map(|c| timefmt::relative_time(c, now)),
                },
            )
        })
        .collect();

    Ok(Json(times))
}

// ── Category handlers ──────────────────────────────────────────

fn category_response(
    state: &SharedState,
    category: Category,
) -> Result<CategoryResponse, ApiError> {
    let todo_count = state
        .store
        .todos_in_category(&category.name)
        .map_err(store_error)?;
    Ok(CategoryResponse {
        id: category.id,
        name: category.name,
        color: category.color,
        description: category.description,
        todo_count,
    })
}

// GET /api/categories
pub async fn list_categories(
    State(state): State<SharedState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.store.list_categories().map_err(store_error)?;
    let mut responses = Vec::with_capacity(categories.len());
    for category in categories {
        responses.push(category_response(&state, category)?);
    }
    Ok(Json(responses))
}

// POST /api/categories
pub async fn create_category(
    State(state): State<SharedState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "category name must not be empty".into(),
        ));
    }
    let category = state
        .store
        .create_category(&payload.name, payload.color, payload.description)
        .map_err(store_error)?;
    tracing::info!(id = category.id, "category created");
    let response = category_response(&state, category)?;
    Ok((StatusCode::CREATED, Json(response)))
}

// PUT /api/categories/:id
pub async fn update_category(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let mut category = state
        .store
        .get_category(id)
        .map_err(store_error)?
        .ok_or_else(|| not_found("category"))?;

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                "category name must not be empty".into(),
            ));
        }
        category.name = name;
    }
    if let Some(color) = payload.color {
        category.color = color;
    }
    if let Some(description) = payload.description {
        category.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
    }

    state
        .store
        .update_category(&category)
        .map_err(store_error)?;
    tracing::info!(id, "category updated");
    let response = category_response(&state, category)?;
    Ok(Json(response))
}

// DELETE /api/categories/:id
pub async fn delete_category(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.store.delete_category(id).map_err(store_error)?;
    if !deleted {
        return Err(not_found("category"));
    }
    tracing::info!(id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Tag handlers ───────────────────────────────────────────────

// GET /api/tags
pub async fn list_tags(State(state): State<SharedState>) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.store.list_tags().map_err(store_error)?;
    Ok(Json(tags))
}

// POST /api/tags
pub async fn create_tag(
    State(state): State<SharedState>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "tag name must not be empty".into()));
    }
    let tag = state
        .store
        .create_tag(&payload.name, payload.color)
        .map_err(store_error)?;
    tracing::info!(id = tag.id, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

// DELETE /api/tags/:id
pub async fn delete_tag(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.store.delete_tag(id).map_err(store_error)?;
    if !deleted {
        return Err(not_found("tag"));
    }
    tracing::info!(id, "tag deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ──────────────────────────────────────────────────────
