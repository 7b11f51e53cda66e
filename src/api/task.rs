use crate::auth::auth::AuthUser;
use crate::model::task::{Task, TaskPriority, TaskStatus};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Collection,
    Composting,
    Facility,
}

impl TaskType {
    fn as_str(&self) -> &str {
        match self {
            TaskType::Collection => "collection",
            TaskType::Composting => "composting",
            TaskType::Facility => "facility",
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTask {
    #[schema(example = "Collect Barangay A route 3")]
    pub title: String,
    #[schema(example = "Morning collection along the riverside route")]
    pub description: Option<String>,
    #[schema(example = "collection")]
    pub task_type: TaskType, // enum keeps the Swagger dropdown honest
    #[schema(example = "high", value_type = String)]
    pub priority: TaskPriority,
    #[schema(example = 42)]
    pub assigned_to: u64,
    #[schema(example = "Barangay A")]
    pub barangay: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct TaskFilter {
    /// Filter by assigned staff profile id
    #[schema(example = 42)]
    pub assigned_to: Option<u64>,
    /// Filter by status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Filter by priority
    #[schema(example = "high")]
    pub priority: Option<String>,
    /// Filter by barangay
    #[schema(example = "Barangay A")]
    pub barangay: Option<String>,
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct TaskListResponse {
    pub data: Vec<Task>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTaskStatus {
    #[schema(example = "in_progress", value_type = String)]
    pub status: TaskStatus,
}

/// Create and assign a task
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = Object, example = json!({
            "id": 7,
            "message": "Task created"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn create_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<CreateTask>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO tasks (title, description, task_type, priority, status, assigned_to, assigned_by, barangay)
        VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.task_type.as_str())
    .bind(body.priority.to_string())
    .bind(body.assigned_to)
    .bind(auth.user_id)
    .bind(&body.barangay)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create task");
        ErrorInternalServerError("Database error")
    })?;

    info!(task_id = result.last_insert_id(), assigned_to = body.assigned_to, "Task created");

    Ok(HttpResponse::Created().json(json!({
        "id": result.last_insert_id(),
        "message": "Task created"
    })))
}

/// Get one task
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    params(
        ("id", Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task", body = Task),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn get_task(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let task_id = path.into_inner();

    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(task_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to fetch task");
            ErrorInternalServerError("Database error")
        })?;

    match task {
        Some(t) => Ok(HttpResponse::Ok().json(t)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Task not found"
        }))),
    }
}

/// Paginated task listing with filters
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(TaskFilter),
    responses(
        (status = 200, description = "Paginated task list", body = TaskListResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn list_tasks(
    pool: web::Data<MySqlPool>,
    query: web::Query<TaskFilter>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<sqlx::types::JsonValue> = Vec::new();

    if let Some(assigned_to) = query.assigned_to {
        conditions.push("assigned_to = ?");
        bindings.push(assigned_to.into());
    }

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        bindings.push(status.clone().into());
    }

    if let Some(priority) = &query.priority {
        conditions.push("priority = ?");
        bindings.push(priority.clone().into());
    }

    if let Some(barangay) = &query.barangay {
        conditions.push("barangay = ?");
        bindings.push(barangay.clone().into());
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM tasks {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting tasks");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count tasks");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM tasks {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching tasks");

    let mut data_query = sqlx::query_as::<_, Task>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let tasks = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch tasks");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(TaskListResponse {
        data: tasks,
        page,
        per_page,
        total,
    }))
}

/// Compare-and-set against the status the transition was checked from, so
/// two concurrent requests cannot both pass `can_transition_to`.
fn status_update_sql(next: TaskStatus) -> String {
    let completed_at_sql = if next == TaskStatus::Completed {
        ", completed_at = NOW()"
    } else {
        ""
    };
    format!(
        "UPDATE tasks SET status = ?{} WHERE id = ? AND status = ?",
        completed_at_sql
    )
}

/// Move a task along its lifecycle
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}/status",
    params(
        ("id", Path, description = "Task ID")
    ),
    request_body = UpdateTaskStatus,
    responses(
        (status = 200, description = "Task status updated"),
        (status = 400, description = "Illegal status transition", body = Object, example = json!({
            "message": "Cannot move task from completed to in_progress"
        })),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task status changed concurrently"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn update_task_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateTaskStatus>,
) -> actix_web::Result<impl Responder> {
    let task_id = path.into_inner();
    let next = body.status;

    let current = sqlx::query_scalar::<_, String>("SELECT status FROM tasks WHERE id = ?")
        .bind(task_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to fetch task status");
            ErrorInternalServerError("Database error")
        })?;

    let current = match current {
        Some(s) => s,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Task not found"
            })));
        }
    };

    let current = TaskStatus::from_str(&current).map_err(|_| {
        error!(task_id, status = %current, "Task row carries unknown status");
        ErrorInternalServerError("Corrupt task status")
    })?;

    // Field staff may advance their own tasks; cancellation stays with
    // supervisors.
    if next == TaskStatus::Cancelled {
        auth.require_supervisor_or_admin()?;
    }

    if !current.can_transition_to(next) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!("Cannot move task from {} to {}", current, next)
        })));
    }

    let result = sqlx::query(&status_update_sql(next))
        .bind(next.to_string())
        .bind(task_id)
        .bind(current.to_string())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, task_id, "Failed to update task status");
            ErrorInternalServerError("Database error")
        })?;

    // Zero rows means another request moved the task between our read and
    // the update.
    if result.rows_affected() == 0 {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Task status changed concurrently, please retry"
        })));
    }

    info!(task_id, from = %current, to = %next, "Task status updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Task status updated"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_update_is_conditional_on_current_status() {
        let sql = status_update_sql(TaskStatus::InProgress);
        assert_eq!(sql, "UPDATE tasks SET status = ? WHERE id = ? AND status = ?");
        assert!(!sql.contains("completed_at"));
    }

    #[test]
    fn completing_a_task_stamps_completed_at() {
        let sql = status_update_sql(TaskStatus::Completed);
        assert_eq!(
            sql,
            "UPDATE tasks SET status = ?, completed_at = NOW() WHERE id = ? AND status = ?"
        );
    }
}
