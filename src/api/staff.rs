use crate::auth::auth::AuthUser;
use crate::model::staff::StaffProfile;
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateStaff {
    #[schema(example = "SB-0042")]
    pub staff_code: String,
    #[schema(example = "Juan Dela Cruz")]
    pub full_name: String,
    #[schema(example = "juan.delacruz@sangboberde.ph")]
    pub email: String,
    #[schema(example = "+639171234567")]
    pub phone: Option<String>,
    /// 3 collector, 4 facility staff, 2 supervisor
    #[schema(example = 3)]
    pub role_id: u8,
    #[schema(example = "Barangay A")]
    pub barangay: String,
    #[schema(example = "2024-03-15", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct StaffQuery {
    /// Filter by role id
    #[schema(example = 3)]
    pub role_id: Option<u8>,
    /// Filter by barangay
    #[schema(example = "Barangay A")]
    pub barangay: Option<String>,
    /// Filter by status
    #[schema(example = "active")]
    pub status: Option<String>,
    /// Search by name or email
    #[schema(example = "juan")]
    pub search: Option<String>,
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct StaffListResponse {
    pub data: Vec<StaffProfile>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/// Create staff profile
#[utoipa::path(
    post,
    path = "/api/v1/staff",
    request_body = CreateStaff,
    responses(
        (status = 201, description = "Staff profile created", body = Object, example = json!({
            "id": 42,
            "message": "Staff profile created"
        })),
        (status = 409, description = "Staff code or email already exists"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Staff"
)]
pub async fn create_staff(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<CreateStaff>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO staff (staff_code, full_name, email, phone, role_id, barangay, hire_date, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'active')
        "#,
    )
    .bind(&body.staff_code)
    .bind(&body.full_name)
    .bind(&body.email)
    .bind(&body.phone)
    .bind(body.role_id)
    .bind(&body.barangay)
    .bind(body.hire_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(r) => Ok(HttpResponse::Created().json(json!({
            "id": r.last_insert_id(),
            "message": "Staff profile created"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Staff code or email already exists"
                    })));
                }
            }

            error!(error = %e, "Failed to create staff profile");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// Get one staff profile
#[utoipa::path(
    get,
    path = "/api/v1/staff/{id}",
    params(
        ("id", Path, description = "Staff profile ID")
    ),
    responses(
        (status = 200, description = "Staff profile", body = StaffProfile),
        (status = 404, description = "Staff profile not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Staff"
)]
pub async fn get_staff(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let staff_id = path.into_inner();

    let profile = sqlx::query_as::<_, StaffProfile>("SELECT * FROM staff WHERE id = ?")
        .bind(staff_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, staff_id, "Failed to fetch staff profile");
            ErrorInternalServerError("Database error")
        })?;

    match profile {
        Some(p) => Ok(HttpResponse::Ok().json(p)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Staff profile not found"
        }))),
    }
}

/// Paginated staff listing with filters
#[utoipa::path(
    get,
    path = "/api/v1/staff",
    params(StaffQuery),
    responses(
        (status = 200, description = "Paginated staff list", body = StaffListResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Staff"
)]
pub async fn list_staff(
    pool: web::Data<MySqlPool>,
    query: web::Query<StaffQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<sqlx::types::JsonValue> = Vec::new();

    if let Some(role_id) = query.role_id {
        conditions.push("role_id = ?");
        bindings.push(role_id.into());
    }

    if let Some(barangay) = &query.barangay {
        conditions.push("barangay = ?");
        bindings.push(barangay.clone().into());
    }

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        bindings.push(status.clone().into());
    }

    if let Some(search) = &query.search {
        conditions.push("(full_name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        bindings.push(like.clone().into());
        bindings.push(like.into());
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM staff {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting staff");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count staff");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM staff {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching staff");

    let mut data_query = sqlx::query_as::<_, StaffProfile>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let profiles = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch staff");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(StaffListResponse {
        data: profiles,
        page,
        per_page,
        total,
    }))
}

/// Update staff profile
#[utoipa::path(
    put,
    path = "/api/v1/staff/{id}",
    params(
        ("id", Path, description = "Staff profile ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Staff profile updated successfully"),
        (status = 404, description = "Staff profile not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Staff"
)]
pub async fn update_staff(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let staff_id = path.into_inner();

    let update = build_update_sql(
        "staff",
        &body,
        &[
            "full_name", "email", "phone", "role_id", "barangay", "hire_date", "status",
        ],
        "id",
        staff_id,
    )?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Staff profile not found"));
    }

    Ok(HttpResponse::Ok().body("Staff profile updated successfully"))
}

/// Delete staff profile
#[utoipa::path(
    delete,
    path = "/api/v1/staff/{id}",
    params(
        ("id", Path, description = "Staff profile ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Staff profile not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Staff"
)]
pub async fn delete_staff(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let staff_id = path.into_inner();

    let result = sqlx::query("DELETE FROM staff WHERE id = ?")
        .bind(staff_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, staff_id, "Failed to delete staff profile");
            ErrorInternalServerError("Database error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().body("Staff profile not found"));
    }

    Ok(HttpResponse::Ok().body("Successfully deleted"))
}
