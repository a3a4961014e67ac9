use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    project::{CreateProject, Project, ProjectError, UpdateProject},
    task::{CreateTask, Task},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

pub async fn get_projects(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_all(state.conn()).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = Project::find_by_id(state.conn(), id)
        .await?
        .ok_or(ProjectError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name is required".to_string()));
    }
    if payload.hourly_rate < 0.0 {
        return Err(ApiError::BadRequest(
            "Hourly rate must not be negative".to_string(),
        ));
    }
    let project = Project::create(state.conn(), &payload, Uuid::new_v4()).await?;
    tracing::info!(project_id = %project.id, "Project created");
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    if matches!(payload.hourly_rate, Some(rate) if rate < 0.0) {
        return Err(ApiError::BadRequest(
            "Hourly rate must not be negative".to_string(),
        ));
    }
    let project = Project::update(state.conn(), id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Project::delete(state.conn(), id).await?;
    if rows_affected == 0 {
        return Err(ProjectError::NotFound.into());
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_project_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_by_project_id(state.conn(), id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_project_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Task name is required".to_string()));
    }
    let task = Task::create(state.conn(), id, &payload, Uuid::new_v4()).await?;
    tracing::info!(task_id = %task.id, project_id = %id, "Task created");
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub fn router() -> Router<AppState> {
    let project_id_router = Router::new()
        .route("/", get(get_project).put(update_project).delete(delete_project))
        .route("/tasks", get(get_project_tasks).post(create_project_task));

    let projects_router = Router::new()
        .route("/", get(get_projects).post(create_project))
        .nest("/{id}", project_id_router);

    Router::new().nest("/projects", projects_router)
}
