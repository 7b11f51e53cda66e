//! GPS-validated QR attendance check-in.
//!
//! Pure decision logic: issuing a time-boxed, location-anchored token and
//! validating a scan of it against the scanning device's position. Persistence
//! and QR image rendering live elsewhere.

pub mod geo;
pub mod token;
pub mod validate;

pub use geo::{Coordinate, haversine_distance};
pub use token::AttendanceToken;
pub use validate::{Checkin, ValidationError, validate_payload, validate_scan};
