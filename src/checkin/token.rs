use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::checkin::geo::Coordinate;
use crate::checkin::validate::ValidationError;

/// Discriminator carried in every attendance QR payload.
pub const TOKEN_KIND: &str = "attendance_checkin";

/// Default validity window issued by the dashboard.
pub const DEFAULT_VALIDITY_MINUTES: i64 = 30;

/// The decoded QR payload. Field names and ISO-8601 timestamps are fixed:
/// tokens must stay byte-compatible with codes already printed or displayed
/// by deployed dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceToken {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub location: WireCoordinate,
    pub admin_id: String,
}

/// Coordinate as it appears on the wire. Older dashboards emit lat/lng as
/// numeric strings, newer ones as numbers; both must decode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireCoordinate {
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lng: f64,
}

impl From<WireCoordinate> for Coordinate {
    fn from(w: WireCoordinate) -> Self {
        Coordinate::new(w.lat, w.lng)
    }
}

impl From<Coordinate> for WireCoordinate {
    fn from(c: Coordinate) -> Self {
        WireCoordinate { lat: c.lat, lng: c.lng }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom("coordinate is not numeric")),
    }
}

impl AttendanceToken {
    /// Issue a token anchored at `anchor`, valid for `validity` from
    /// `issued_at`. Rendering the QR image is the caller's concern.
    pub fn issue(
        anchor: Coordinate,
        issued_at: DateTime<Utc>,
        validity: Duration,
        admin_id: &str,
    ) -> Result<Self, ValidationError> {
        if !anchor.is_valid() {
            return Err(ValidationError::InvalidCoordinate);
        }
        if validity <= Duration::zero() {
            return Err(ValidationError::InvalidWindow);
        }

        Ok(Self {
            kind: TOKEN_KIND.to_string(),
            timestamp: issued_at,
            valid_until: issued_at + validity,
            location: anchor.into(),
            admin_id: admin_id.to_string(),
        })
    }

    /// Strictly decode a scanned payload. Anything that is not JSON in the
    /// exact token shape, or that carries the wrong discriminator or an
    /// out-of-range anchor, is a `MalformedToken`.
    pub fn decode(payload: &str) -> Result<Self, ValidationError> {
        let token: AttendanceToken =
            serde_json::from_str(payload).map_err(|_| ValidationError::MalformedToken)?;

        if token.kind != TOKEN_KIND {
            return Err(ValidationError::MalformedToken);
        }
        if !Coordinate::from(token.location).is_valid() {
            return Err(ValidationError::MalformedToken);
        }
        if token.valid_until <= token.timestamp {
            return Err(ValidationError::MalformedToken);
        }

        Ok(token)
    }

    pub fn anchor(&self) -> Coordinate {
        self.location.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn issue_sets_validity_window() {
        let anchor = Coordinate::new(17.87, 120.46);
        let token =
            AttendanceToken::issue(anchor, t0(), Duration::minutes(30), "admin-1").unwrap();

        assert_eq!(token.kind, TOKEN_KIND);
        assert_eq!(token.valid_until - token.timestamp, Duration::minutes(30));
        assert_eq!(token.anchor(), anchor);
    }

    #[test]
    fn issue_rejects_bad_inputs() {
        let anchor = Coordinate::new(17.87, 120.46);
        assert_eq!(
            AttendanceToken::issue(Coordinate::new(95.0, 0.0), t0(), Duration::minutes(30), "a"),
            Err(ValidationError::InvalidCoordinate)
        );
        assert_eq!(
            AttendanceToken::issue(anchor, t0(), Duration::zero(), "a"),
            Err(ValidationError::InvalidWindow)
        );
        assert_eq!(
            AttendanceToken::issue(anchor, t0(), Duration::minutes(-5), "a"),
            Err(ValidationError::InvalidWindow)
        );
    }

    #[test]
    fn decode_round_trips_issued_token() {
        let token = AttendanceToken::issue(
            Coordinate::new(17.87, 120.46),
            t0(),
            Duration::minutes(30),
            "admin-1",
        )
        .unwrap();

        let payload = serde_json::to_string(&token).unwrap();
        assert_eq!(AttendanceToken::decode(&payload).unwrap(), token);
    }

    #[test]
    fn decode_accepts_string_coordinates() {
        // Shape emitted by the legacy dashboard: lat/lng as strings.
        let payload = r#"{
            "type": "attendance_checkin",
            "timestamp": "2025-06-01T08:00:00Z",
            "valid_until": "2025-06-01T08:30:00Z",
            "location": {"lat": "17.87", "lng": "120.46"},
            "admin_id": "current-admin-id"
        }"#;

        let token = AttendanceToken::decode(payload).unwrap();
        assert_eq!(token.anchor(), Coordinate::new(17.87, 120.46));
        assert_eq!(token.admin_id, "current-admin-id");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(
            AttendanceToken::decode("not json"),
            Err(ValidationError::MalformedToken)
        );
        assert_eq!(
            AttendanceToken::decode("{}"),
            Err(ValidationError::MalformedToken)
        );
    }

    #[test]
    fn decode_rejects_wrong_discriminator() {
        let payload = r#"{
            "type": "task_assignment",
            "timestamp": "2025-06-01T08:00:00Z",
            "valid_until": "2025-06-01T08:30:00Z",
            "location": {"lat": 17.87, "lng": 120.46},
            "admin_id": "admin-1"
        }"#;
        assert_eq!(
            AttendanceToken::decode(payload),
            Err(ValidationError::MalformedToken)
        );
    }

    #[test]
    fn decode_rejects_inverted_window() {
        let payload = r#"{
            "type": "attendance_checkin",
            "timestamp": "2025-06-01T08:30:00Z",
            "valid_until": "2025-06-01T08:00:00Z",
            "location": {"lat": 17.87, "lng": 120.46},
            "admin_id": "admin-1"
        }"#;
        assert_eq!(
            AttendanceToken::decode(payload),
            Err(ValidationError::MalformedToken)
        );
    }

    #[test]
    fn decode_rejects_non_numeric_coordinate_strings() {
        let payload = r#"{
            "type": "attendance_checkin",
            "timestamp": "2025-06-01T08:00:00Z",
            "valid_until": "2025-06-01T08:30:00Z",
            "location": {"lat": "here", "lng": "120.46"},
            "admin_id": "admin-1"
        }"#;
        assert_eq!(
            AttendanceToken::decode(payload),
            Err(ValidationError::MalformedToken)
        );
    }
}
