//! Ellipsoid geometry: surface normals, geodetic/geocentric conversion, and
//! surface curve sampling.
//!
//! All positions are geocentric Cartesian coordinates in meters with the
//! ellipsoid centered at the origin: +X pierces (0°, 0°), +Y pierces
//! (90°E, 0°), +Z pierces the north pole.

use glam::{DQuat, DVec3};

use crate::{Geodetic2, Geodetic3};

/// An ellipsoid of revolution (or triaxial ellipsoid) defined by three radii.
///
/// Immutable after construction. All radii must be positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    radii: DVec3,
    radii_squared: DVec3,
    radii_to_the_fourth: DVec3,
    one_over_radii_squared: DVec3,
}

impl Ellipsoid {
    /// Create an ellipsoid with the given radii in meters.
    ///
    /// # Panics
    ///
    /// Panics if any radius is not strictly positive.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        assert!(
            x > 0.0 && y > 0.0 && z > 0.0,
            "ellipsoid radii must be positive, got ({x}, {y}, {z})"
        );
        let radii = DVec3::new(x, y, z);
        let radii_squared = radii * radii;
        Self {
            radii,
            radii_squared,
            radii_to_the_fourth: radii_squared * radii_squared,
            one_over_radii_squared: 1.0 / radii_squared,
        }
    }

    /// The WGS84 reference ellipsoid.
    pub fn wgs84() -> Self {
        Self::new(6378137.0, 6378137.0, 6356752.314245)
    }

    /// A unit sphere, useful for scale-independent tests and demos.
    pub fn unit_sphere() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// The three radii in meters.
    pub fn radii(&self) -> DVec3 {
        self.radii
    }

    /// The squared radii.
    pub fn radii_squared(&self) -> DVec3 {
        self.radii_squared
    }

    /// One over the squared radii.
    pub fn one_over_radii_squared(&self) -> DVec3 {
        self.one_over_radii_squared
    }

    /// The smallest of the three radii.
    pub fn minimum_radius(&self) -> f64 {
        self.radii.x.min(self.radii.y).min(self.radii.z)
    }

    /// The largest of the three radii.
    pub fn maximum_radius(&self) -> f64 {
        self.radii.x.max(self.radii.y).max(self.radii.z)
    }

    /// The outward surface normal at a geodetic coordinate.
    pub fn geodetic_surface_normal(&self, geodetic: Geodetic3) -> DVec3 {
        let cos_latitude = geodetic.latitude.cos();
        DVec3::new(
            cos_latitude * geodetic.longitude.cos(),
            cos_latitude * geodetic.longitude.sin(),
            geodetic.latitude.sin(),
        )
    }

    /// The outward surface normal at a point on (or near) the surface.
    ///
    /// The normal is the normalized gradient of the implicit ellipsoid
    /// surface at `position`.
    pub fn geodetic_surface_normal_at(&self, position: DVec3) -> DVec3 {
        (position * self.one_over_radii_squared).normalize()
    }

    /// Convert a geodetic coordinate to geocentric Cartesian coordinates.
    pub fn to_cartesian(&self, geodetic: Geodetic3) -> DVec3 {
        let n = self.geodetic_surface_normal(geodetic);
        let k = self.radii_squared * n;
        let gamma = (k.dot(n)).sqrt();
        let surface = k / gamma;
        surface + geodetic.height * n
    }

    /// Convert a geocentric Cartesian position to longitude/latitude.
    pub fn to_geodetic2(&self, position: DVec3) -> Geodetic2 {
        let n = self.geodetic_surface_normal_at(self.scale_to_geodetic_surface(position));
        Geodetic2::new(n.y.atan2(n.x), n.z.asin())
    }

    /// Convert a geocentric Cartesian position to longitude/latitude/height.
    pub fn to_geodetic3(&self, position: DVec3) -> Geodetic3 {
        let p = self.scale_to_geodetic_surface(position);
        let h = position - p;
        let height = h.dot(position).signum() * h.length();
        let g = self.to_geodetic2(p);
        Geodetic3::new(g.longitude, g.latitude, height)
    }

    /// Project a position onto the surface along the geodetic normal.
    ///
    /// Newton iteration on the scale parameter; converges in a handful of
    /// iterations for positions anywhere from the center out to deep space.
    pub fn scale_to_geodetic_surface(&self, position: DVec3) -> DVec3 {
        let p2 = position * position;
        let beta = 1.0 / (p2.dot(self.one_over_radii_squared)).sqrt();
        let n = (beta * position * self.one_over_radii_squared).length();
        let mut alpha = (1.0 - beta) * (position.length() / n);

        let mut da;
        let mut db;
        let mut dc;

        let mut s = 0.0;
        let mut ds_da = 1.0;

        loop {
            alpha -= s / ds_da;

            da = 1.0 + alpha * self.one_over_radii_squared.x;
            db = 1.0 + alpha * self.one_over_radii_squared.y;
            dc = 1.0 + alpha * self.one_over_radii_squared.z;

            let da2 = da * da;
            let db2 = db * db;
            let dc2 = dc * dc;

            s = p2.x / (self.radii_squared.x * da2)
                + p2.y / (self.radii_squared.y * db2)
                + p2.z / (self.radii_squared.z * dc2)
                - 1.0;

            ds_da = -2.0
                * (p2.x / (self.radii_to_the_fourth.x * da2 * da)
                    + p2.y / (self.radii_to_the_fourth.y * db2 * db)
                    + p2.z / (self.radii_to_the_fourth.z * dc2 * dc));

            if s.abs() <= 1e-10 {
                break;
            }
        }

        DVec3::new(position.x / da, position.y / db, position.z / dc)
    }

    /// Project a position onto the surface along the ray through the center.
    pub fn scale_to_geocentric_surface(&self, position: DVec3) -> DVec3 {
        let p2 = position * position;
        let beta = 1.0 / (p2.dot(self.one_over_radii_squared)).sqrt();
        beta * position
    }

    /// Sample a curve on the surface between two surface points.
    ///
    /// The curve follows the plane through `start`, `stop`, and the center,
    /// with consecutive samples separated by at most `granularity` radians
    /// of arc. Both endpoints are included.
    ///
    /// # Panics
    ///
    /// Panics if `granularity` is not strictly positive.
    pub fn surface_curve(&self, start: DVec3, stop: DVec3, granularity: f64) -> Vec<DVec3> {
        assert!(
            granularity > 0.0,
            "granularity must be positive, got {granularity}"
        );

        let normal = start.cross(stop).normalize();
        let theta = start.angle_between(stop);
        let n = ((theta / granularity) as i32 - 1).max(0);

        let mut positions = Vec::with_capacity(n as usize + 2);
        positions.push(start);
        for i in 1..=n {
            let phi = i as f64 * granularity;
            let rotated = DQuat::from_axis_angle(normal, phi) * start;
            positions.push(self.scale_to_geodetic_surface(rotated));
        }
        positions.push(stop);
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::to_radians;

    fn assert_close(a: DVec3, b: DVec3, epsilon: f64) {
        assert!(
            (a - b).length() < epsilon,
            "expected {b:?}, got {a:?} (epsilon {epsilon})"
        );
    }

    #[test]
    #[should_panic(expected = "radii must be positive")]
    fn test_zero_radius_panics() {
        Ellipsoid::new(1.0, 0.0, 1.0);
    }

    #[test]
    fn test_min_max_radius() {
        let e = Ellipsoid::wgs84();
        assert_eq!(e.maximum_radius(), 6378137.0);
        assert_eq!(e.minimum_radius(), 6356752.314245);
    }

    /// Surface normals on a WGS84-like ellipsoid point along the axes at the
    /// equator reference points.
    #[test]
    fn test_surface_normal_at_axis_points() {
        let e = Ellipsoid::new(6378137.0, 6378137.0, 6356752.0);

        let n0 = e.geodetic_surface_normal(Geodetic3::from_degrees(0.0, 0.0, 0.0));
        assert_close(n0, DVec3::X, 1e-10);

        let n90 = e.geodetic_surface_normal(Geodetic3::from_degrees(90.0, 0.0, 0.0));
        assert_close(n90, DVec3::Y, 1e-10);

        let np = e.geodetic_surface_normal(Geodetic3::from_degrees(0.0, 90.0, 0.0));
        assert_close(np, DVec3::Z, 1e-10);
    }

    #[test]
    fn test_to_cartesian_equator() {
        let e = Ellipsoid::wgs84();
        let p = e.to_cartesian(Geodetic3::from_degrees(0.0, 0.0, 0.0));
        assert_close(p, DVec3::new(6378137.0, 0.0, 0.0), 1e-6);

        let q = e.to_cartesian(Geodetic3::from_degrees(90.0, 0.0, 0.0));
        assert_close(q, DVec3::new(0.0, 6378137.0, 0.0), 1e-6);
    }

    #[test]
    fn test_to_cartesian_pole_uses_polar_radius() {
        let e = Ellipsoid::wgs84();
        let p = e.to_cartesian(Geodetic3::from_degrees(0.0, 90.0, 0.0));
        assert_close(p, DVec3::new(0.0, 0.0, 6356752.314245), 1e-6);
    }

    /// Cartesian -> geodetic -> Cartesian round-trips to within a micron.
    #[test]
    fn test_geodetic_round_trip() {
        let e = Ellipsoid::wgs84();
        let original = Geodetic3::new(to_radians(-119.5326), to_radians(37.7445), 2700.0);

        let cartesian = e.to_cartesian(original);
        let geodetic = e.to_geodetic3(cartesian);

        assert!((geodetic.longitude - original.longitude).abs() < 1e-12);
        assert!((geodetic.latitude - original.latitude).abs() < 1e-12);
        assert!((geodetic.height - original.height).abs() < 1e-6);
    }

    #[test]
    fn test_negative_height_round_trip() {
        let e = Ellipsoid::wgs84();
        let below = Geodetic3::from_degrees(45.0, -30.0, -400.0);
        let geodetic = e.to_geodetic3(e.to_cartesian(below));
        assert!((geodetic.height + 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_to_geodetic_surface_lands_on_surface() {
        let e = Ellipsoid::wgs84();
        let p = e.scale_to_geodetic_surface(DVec3::new(8_000_000.0, 4_000_000.0, 3_000_000.0));
        let f = (p * p).dot(e.one_over_radii_squared());
        assert!((f - 1.0).abs() < 1e-9, "implicit function value {f}");
    }

    #[test]
    fn test_scale_to_geocentric_surface_preserves_direction() {
        let e = Ellipsoid::wgs84();
        let position = DVec3::new(8_000_000.0, 4_000_000.0, 3_000_000.0);
        let p = e.scale_to_geocentric_surface(position);
        assert_close(p.normalize(), position.normalize(), 1e-12);
        let f = (p * p).dot(e.one_over_radii_squared());
        assert!((f - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_surface_curve_endpoints_and_spacing() {
        let e = Ellipsoid::unit_sphere();
        let start = DVec3::X;
        let stop = DVec3::Y;
        let granularity = to_radians(10.0);

        let curve = e.surface_curve(start, stop, granularity);

        assert_eq!(curve[0], start);
        assert_eq!(*curve.last().unwrap(), stop);
        // 90 degrees at 10 degree granularity: roughly eight interior
        // samples, none further apart than the granularity.
        assert!(curve.len() >= 9 && curve.len() <= 11, "{} samples", curve.len());
        for pair in curve.windows(2) {
            assert!(pair[0].angle_between(pair[1]) <= granularity + 1e-9);
        }
        for p in &curve {
            assert!((p.length() - 1.0).abs() < 1e-10, "not on sphere: {p:?}");
        }
    }
}
