//! Geodetic coordinate types (longitude/latitude in radians).

/// A longitude/latitude pair in radians.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Geodetic2 {
    /// Longitude in radians, positive east.
    pub longitude: f64,
    /// Latitude in radians, positive north.
    pub latitude: f64,
}

impl Geodetic2 {
    /// Create a new geodetic coordinate from radians.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Create a new geodetic coordinate from degrees.
    pub fn from_degrees(longitude: f64, latitude: f64) -> Self {
        Self::new(crate::to_radians(longitude), crate::to_radians(latitude))
    }
}

impl From<Geodetic3> for Geodetic2 {
    fn from(g: Geodetic3) -> Self {
        Self::new(g.longitude, g.latitude)
    }
}

/// A longitude/latitude pair in radians plus height in meters above the
/// ellipsoid surface.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Geodetic3 {
    /// Longitude in radians, positive east.
    pub longitude: f64,
    /// Latitude in radians, positive north.
    pub latitude: f64,
    /// Height above the ellipsoid surface in meters.
    pub height: f64,
}

impl Geodetic3 {
    /// Create a new geodetic coordinate from radians and meters.
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Create a new geodetic coordinate from degrees and meters.
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new(
            crate::to_radians(longitude),
            crate::to_radians(latitude),
            height,
        )
    }

    /// The surface point directly below (or above) this coordinate.
    pub fn on_surface(&self) -> Geodetic3 {
        Self::new(self.longitude, self.latitude, 0.0)
    }
}

impl From<Geodetic2> for Geodetic3 {
    fn from(g: Geodetic2) -> Self {
        Self::new(g.longitude, g.latitude, 0.0)
    }
}
