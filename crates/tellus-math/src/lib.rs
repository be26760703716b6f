//! Ellipsoid and geodetic math for the Tellus globe engine.

mod ellipsoid;
mod extent;
mod geodetic;

pub use ellipsoid::Ellipsoid;
pub use extent::GeodeticExtent;
pub use geodetic::{Geodetic2, Geodetic3};

/// Convert degrees to radians.
pub fn to_radians(degrees: f64) -> f64 {
    degrees * (std::f64::consts::PI / 180.0)
}

/// Convert radians to degrees.
pub fn to_degrees(radians: f64) -> f64 {
    radians * (180.0 / std::f64::consts::PI)
}
