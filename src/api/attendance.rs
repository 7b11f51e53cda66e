use crate::auth::auth::AuthUser;
use crate::checkin::{AttendanceToken, Coordinate, ValidationError, validate_payload};
use crate::config::Config;
use crate::model::attendance::AttendanceRecord;
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct GenerateQrReq {
    /// Anchor latitude, usually the supervisor's current position
    #[schema(example = 17.87)]
    pub lat: f64,
    #[schema(example = 120.46)]
    pub lng: f64,
    /// Overrides the configured validity window when present
    #[schema(example = 30)]
    pub validity_minutes: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateQrResponse {
    /// Decoded token object, for display alongside the code
    #[schema(value_type = Object)]
    pub token: AttendanceToken,
    /// Exact JSON string the client encodes into the QR image
    pub payload: String,
}

/// Issue an attendance QR token anchored at the caller's position
#[utoipa::path(
    post,
    path = "/api/v1/attendance/qr",
    request_body = GenerateQrReq,
    responses(
        (status = 200, description = "Token issued", body = GenerateQrResponse),
        (status = 400, description = "Invalid anchor or validity window"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Supervisor/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn generate_qr(
    auth: AuthUser,
    config: web::Data<Config>,
    body: web::Json<GenerateQrReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let validity = Duration::minutes(body.validity_minutes.unwrap_or(config.qr_validity_minutes));
    let anchor = Coordinate::new(body.lat, body.lng);

    let token = match AttendanceToken::issue(anchor, Utc::now(), validity, &auth.user_id.to_string())
    {
        Ok(t) => t,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "error": e.to_string() })));
        }
    };

    let payload = serde_json::to_string(&token).map_err(ErrorInternalServerError)?;

    info!(
        issuer = auth.user_id,
        valid_until = %token.valid_until,
        "Attendance QR token issued"
    );

    Ok(HttpResponse::Ok().json(GenerateQrResponse { token, payload }))
}

#[derive(Deserialize, ToSchema)]
pub struct CheckInReq {
    /// Raw string decoded from the scanned QR code
    #[schema(example = r#"{"type":"attendance_checkin","timestamp":"2025-06-01T08:00:00Z","valid_until":"2025-06-01T08:30:00Z","location":{"lat":17.87,"lng":120.46},"admin_id":"1"}"#)]
    pub payload: String,
    /// Device latitude; absent when the position provider failed
    #[schema(example = 17.870113)]
    pub lat: Option<f64>,
    #[schema(example = 120.460087)]
    pub lng: Option<f64>,
    /// Accuracy radius reported by the positioning subsystem, recorded only
    #[schema(example = 8.5)]
    pub accuracy_m: Option<f64>,
    /// Set by the client when it could not obtain a fix at all
    #[schema(example = false)]
    pub position_unavailable: Option<bool>,
}

fn rejection_code(e: &ValidationError) -> &'static str {
    match e {
        ValidationError::MalformedToken => "malformed_token",
        ValidationError::TokenExpired => "token_expired",
        ValidationError::LocationOutOfRange { .. } => "location_out_of_range",
        ValidationError::PositionUnavailable => "position_unavailable",
        ValidationError::InvalidCoordinate => "invalid_coordinate",
        ValidationError::InvalidWindow => "invalid_window",
    }
}

fn rejection_response(e: ValidationError) -> HttpResponse {
    let mut body = json!({
        "error": e.to_string(),
        "code": rejection_code(&e),
    });
    if let ValidationError::LocationOutOfRange { distance_m } = &e {
        body["distance_m"] = json!(distance_m.round());
    }
    HttpResponse::UnprocessableEntity().json(body)
}

/// QR check-in: validates the scanned token against the device position
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckInReq,
    responses(
        (status = 201, description = "Checked in successfully", body = AttendanceRecord),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile"),
        (status = 422, description = "Scan rejected", body = Object, example = json!({
            "error": "You are 1337m away from the expected location. Please move closer.",
            "code": "location_out_of_range",
            "distance_m": 1337.0
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Json<CheckInReq>,
) -> actix_web::Result<impl Responder> {
    let staff_id: u64 = auth
        .staff_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No staff profile"))?;

    // A failed position provider is its own rejection, never conflated with
    // being out of range.
    let device = match (body.position_unavailable.unwrap_or(false), body.lat, body.lng) {
        (false, Some(lat), Some(lng)) => Coordinate::new(lat, lng),
        _ => return Ok(rejection_response(ValidationError::PositionUnavailable)),
    };

    let scanned_at = Utc::now();
    let checkin = match validate_payload(
        &body.payload,
        scanned_at,
        device,
        config.geofence_tolerance_m,
    ) {
        Ok(c) => c,
        Err(e) => {
            info!(staff_id, code = rejection_code(&e), "Check-in rejected");
            return Ok(rejection_response(e));
        }
    };

    let already_in = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM attendance WHERE staff_id = ? AND DATE(check_in) = CURDATE())",
    )
    .bind(staff_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, staff_id, "Failed to check existing attendance");
        ErrorInternalServerError("Database error")
    })?;

    if already_in {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Already checked in today"
        })));
    }

    let notes = format!(
        "QR code check-in ({}m from QR location)",
        checkin.distance_from_anchor_m.round()
    );

    let result = sqlx::query(
        r#"
        INSERT INTO attendance
            (staff_id, check_in, location_lat, location_lng, distance_from_anchor_m, status, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(staff_id)
    .bind(checkin.checked_in_at)
    .bind(checkin.location.lat)
    .bind(checkin.location.lng)
    .bind(checkin.distance_from_anchor_m)
    .bind(checkin.status.to_string())
    .bind(&notes)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, staff_id, "Check-in insert failed");
        ErrorInternalServerError("Database error")
    })?;

    let record = sqlx::query_as::<_, AttendanceRecord>("SELECT * FROM attendance WHERE id = ?")
        .bind(result.last_insert_id())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, staff_id, "Failed to load inserted attendance row");
            ErrorInternalServerError("Database error")
        })?;

    info!(
        staff_id,
        distance_m = checkin.distance_from_anchor_m,
        accuracy_m = body.accuracy_m,
        "Checked in"
    );

    Ok(HttpResponse::Created().json(record))
}

/// Check-out endpoint: closes today's open shift
#[utoipa::path(
    put,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let staff_id: u64 = auth
        .staff_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No staff profile"))?;

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = NOW()
        WHERE staff_id = ?
        AND DATE(check_in) = CURDATE()
        AND check_out IS NULL
        "#,
    )
    .bind(staff_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, staff_id, "Check-out failed");
        ErrorInternalServerError("Database error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No active check-in found for today"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully"
    })))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    /// Filter by staff profile id
    #[schema(example = 42)]
    pub staff_id: Option<u64>,
    /// Filter by status (present/late/absent)
    #[schema(example = "present")]
    pub status: Option<String>,
    /// Filter by shift date
    #[schema(example = "2025-06-01", value_type = String, format = "date")]
    pub date: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Items per page
    #[schema(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/// Paginated attendance listing for the dashboard
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<sqlx::types::JsonValue> = Vec::new();

    if let Some(staff_id) = query.staff_id {
        conditions.push("staff_id = ?");
        bindings.push(staff_id.into());
    }

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        bindings.push(status.clone().into());
    }

    if let Some(date) = query.date {
        conditions.push("DATE(check_in) = ?");
        bindings.push(date.to_string().into());
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM attendance {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting attendance rows");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count attendance rows");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM attendance {} ORDER BY check_in DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching attendance rows");

    let mut data_query = sqlx::query_as::<_, AttendanceRecord>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let records = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch attendance rows");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data: records,
        page,
        per_page,
        total,
    }))
}

/// Revise an attendance record (late marking, notes). Records are never
/// deleted through this API.
#[utoipa::path(
    patch,
    path = "/api/v1/attendance/{id}",
    params(
        ("id", Path, description = "Attendance record ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Attendance updated successfully"),
        (status = 400, description = "Invalid patch body"),
        (status = 404, description = "Attendance record not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let record_id = path.into_inner();

    let update = build_update_sql(
        "attendance",
        &body,
        &["status", "notes", "check_out"],
        "id",
        record_id,
    )?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Attendance record not found"));
    }

    Ok(HttpResponse::Ok().body("Attendance updated successfully"))
}
