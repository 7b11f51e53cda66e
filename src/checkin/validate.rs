use chrono::{DateTime, Utc};
use derive_more::Display;

use crate::checkin::geo::{Coordinate, haversine_distance};
use crate::checkin::token::AttendanceToken;
use crate::model::attendance::AttendanceStatus;

/// Maximum distance from the token anchor accepted by default, in meters.
pub const DEFAULT_TOLERANCE_M: f64 = 100.0;

/// Why a scan (or a token issuance) was rejected. Every variant renders as
/// the message shown to the staff member on the mobile client.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ValidationError {
    #[display(fmt = "Invalid QR code format. Please scan a valid attendance QR code.")]
    MalformedToken,
    #[display(fmt = "QR code has expired. Please ask admin to generate a new one.")]
    TokenExpired,
    #[display(
        fmt = "You are {}m away from the expected location. Please move closer.",
        "distance_m.round()"
    )]
    LocationOutOfRange { distance_m: f64 },
    #[display(fmt = "Unable to get current location. Please ensure location services are enabled.")]
    PositionUnavailable,
    #[display(fmt = "Anchor coordinate is out of range.")]
    InvalidCoordinate,
    #[display(fmt = "Validity window must be positive.")]
    InvalidWindow,
}

/// Outcome of a successful scan, ready to be persisted as an attendance row.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkin {
    pub checked_in_at: DateTime<Utc>,
    pub location: Coordinate,
    pub distance_from_anchor_m: f64,
    pub status: AttendanceStatus,
}

/// Decide whether a decoded token, the scan time and the device position
/// constitute a valid check-in. Pure, single shot: expiry is checked before
/// location, exactly-at-tolerance passes, and nothing is retried here.
pub fn validate_scan(
    token: &AttendanceToken,
    scanned_at: DateTime<Utc>,
    device_location: Coordinate,
    tolerance_m: f64,
) -> Result<Checkin, ValidationError> {
    if scanned_at > token.valid_until {
        return Err(ValidationError::TokenExpired);
    }

    let distance_m = haversine_distance(device_location, token.anchor());
    if distance_m > tolerance_m {
        return Err(ValidationError::LocationOutOfRange { distance_m });
    }

    Ok(Checkin {
        checked_in_at: scanned_at,
        location: device_location,
        distance_from_anchor_m: distance_m,
        status: AttendanceStatus::Present,
    })
}

/// Decode a raw scanned payload and validate it in one step.
pub fn validate_payload(
    payload: &str,
    scanned_at: DateTime<Utc>,
    device_location: Coordinate,
    tolerance_m: f64,
) -> Result<Checkin, ValidationError> {
    let token = AttendanceToken::decode(payload)?;
    validate_scan(&token, scanned_at, device_location, tolerance_m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const ANCHOR: Coordinate = Coordinate { lat: 17.87, lng: 120.46 };

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn token() -> AttendanceToken {
        AttendanceToken::issue(ANCHOR, issued_at(), Duration::minutes(30), "admin-1").unwrap()
    }

    #[test]
    fn scan_at_anchor_within_window_passes() {
        let scanned = issued_at() + Duration::minutes(10);
        let checkin = validate_scan(&token(), scanned, ANCHOR, 100.0).unwrap();

        assert_eq!(checkin.checked_in_at, scanned);
        assert_eq!(checkin.location, ANCHOR);
        assert_eq!(checkin.distance_from_anchor_m, 0.0);
        assert_eq!(checkin.status, AttendanceStatus::Present);
    }

    #[test]
    fn expired_token_is_rejected() {
        let scanned = issued_at() + Duration::minutes(31);
        assert_eq!(
            validate_scan(&token(), scanned, ANCHOR, 100.0),
            Err(ValidationError::TokenExpired)
        );
    }

    #[test]
    fn expiry_wins_over_location() {
        // An expired token is rejected as expired even when the device is
        // nowhere near the anchor.
        let scanned = issued_at() + Duration::hours(2);
        let far = Coordinate::new(14.5995, 120.9842);
        assert_eq!(
            validate_scan(&token(), scanned, far, 100.0),
            Err(ValidationError::TokenExpired)
        );
    }

    #[test]
    fn scan_at_exact_expiry_still_passes() {
        let scanned = issued_at() + Duration::minutes(30);
        assert!(validate_scan(&token(), scanned, ANCHOR, 100.0).is_ok());
    }

    #[test]
    fn far_device_is_rejected_with_distance() {
        // Roughly 1.5 km northeast of the anchor.
        let device = Coordinate::new(17.88, 120.47);
        let scanned = issued_at() + Duration::minutes(5);

        match validate_scan(&token(), scanned, device, 100.0) {
            Err(ValidationError::LocationOutOfRange { distance_m }) => {
                assert!(
                    (1300.0..1700.0).contains(&distance_m),
                    "got {distance_m}"
                );
            }
            other => panic!("expected LocationOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn nearby_device_passes() {
        // ~44 m north of the anchor, well inside the 100 m tolerance.
        let device = Coordinate::new(17.8704, 120.46);
        let scanned = issued_at() + Duration::minutes(5);

        let checkin = validate_scan(&token(), scanned, device, 100.0).unwrap();
        assert!(checkin.distance_from_anchor_m < 50.0);
    }

    #[test]
    fn exactly_at_tolerance_passes() {
        let scanned = issued_at() + Duration::minutes(5);
        let device = Coordinate::new(17.8704, 120.46);
        let exact = haversine_distance(device, ANCHOR);

        // Pin the tolerance to the measured distance: <= passes, anything
        // tighter fails.
        assert!(validate_scan(&token(), scanned, device, exact).is_ok());
        assert!(matches!(
            validate_scan(&token(), scanned, device, exact - 0.001),
            Err(ValidationError::LocationOutOfRange { .. })
        ));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let scanned = issued_at();
        assert_eq!(
            validate_payload("not json", scanned, ANCHOR, 100.0),
            Err(ValidationError::MalformedToken)
        );
    }

    #[test]
    fn payload_round_trip_validates() {
        let payload = serde_json::to_string(&token()).unwrap();
        let scanned = issued_at() + Duration::minutes(1);
        assert!(validate_payload(&payload, scanned, ANCHOR, 100.0).is_ok());
    }

    #[test]
    fn rejection_messages_are_user_facing() {
        let err = ValidationError::LocationOutOfRange { distance_m: 1337.4 };
        assert_eq!(
            err.to_string(),
            "You are 1337m away from the expected location. Please move closer."
        );
        assert!(ValidationError::TokenExpired.to_string().contains("expired"));
    }
}
