use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Attendance status as stored in the `attendance.status` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

/// One shift of one staff member. Created exactly once per validated scan;
/// later mutated only to close the shift or revise the status, never deleted.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "staff_id": 42,
    "check_in": "2025-06-01T08:05:12Z",
    "check_out": null,
    "location_lat": 17.870113,
    "location_lng": 120.460087,
    "distance_from_anchor_m": 12.8,
    "status": "present",
    "notes": "QR code check-in (13m from QR location)",
    "created_at": "2025-06-01T08:05:12Z"
}))]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 42)]
    pub staff_id: u64,

    #[schema(example = "2025-06-01T08:05:12Z", format = "date-time", value_type = String)]
    pub check_in: DateTime<Utc>,

    /// Absent while the shift is still open.
    #[schema(example = "2025-06-01T17:02:44Z", format = "date-time", value_type = String, nullable = true)]
    pub check_out: Option<DateTime<Utc>>,

    #[schema(example = 17.870113)]
    pub location_lat: f64,

    #[schema(example = 120.460087)]
    pub location_lng: f64,

    /// Geodesic distance from the token anchor at validation time, kept for audit.
    #[schema(example = 12.8)]
    pub distance_from_anchor_m: f64,

    #[schema(example = "present", value_type = String)]
    pub status: String,

    #[schema(example = "QR code check-in (13m from QR location)", nullable = true)]
    pub notes: Option<String>,

    #[schema(example = "2025-06-01T08:05:12Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(AttendanceStatus::Present.to_string(), "present");
        assert_eq!(AttendanceStatus::from_str("late"), Ok(AttendanceStatus::Late));
        assert!(AttendanceStatus::from_str("on_leave").is_err());
    }
}
