//! Latitude/longitude bounding boxes.

use std::fmt;

use geo::{Coord, Polygon, Rect};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors raised when constructing geographic extents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Invalid latitude: {0}")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// Minimum exceeds maximum on one axis.
    #[error("Inverted bounds: min {min} exceeds max {max}")]
    InvertedBounds { min: f64, max: f64 },

    /// A polygon with fewer than three distinct vertices or no area.
    #[error("Degenerate polygon: {0}")]
    DegeneratePolygon(String),
}

/// Reject out-of-range or NaN coordinates.
pub(super) fn check_coordinate(lat: f64, lon: f64) -> Result<(), GeoError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(GeoError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(GeoError::InvalidLongitude(lon));
    }
    Ok(())
}

/// A closed geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Minimum (southernmost) latitude
    pub min_lat: f64,
    /// Maximum (northernmost) latitude
    pub max_lat: f64,
    /// Minimum (westernmost) longitude
    pub min_lon: f64,
    /// Maximum (easternmost) longitude
    pub max_lon: f64,
}

impl GeoBounds {
    /// The whole globe.
    pub const WORLD: GeoBounds = GeoBounds {
        min_lat: MIN_LAT,
        max_lat: MAX_LAT,
        min_lon: MIN_LON,
        max_lon: MAX_LON,
    };

    /// Create a new bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] for out-of-range or NaN coordinates, or if a
    /// minimum exceeds its maximum.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, GeoError> {
        check_coordinate(min_lat, min_lon)?;
        check_coordinate(max_lat, max_lon)?;
        if min_lat > max_lat {
            return Err(GeoError::InvertedBounds {
                min: min_lat,
                max: max_lat,
            });
        }
        if min_lon > max_lon {
            return Err(GeoError::InvertedBounds {
                min: min_lon,
                max: max_lon,
            });
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Create a bounding box from a single point.
    pub fn from_point(lat: f64, lon: f64) -> Result<Self, GeoError> {
        Self::new(lat, lat, lon, lon)
    }

    /// Expand this bounding box to include another.
    pub fn expand(&mut self, other: &GeoBounds) {
        self.min_lat = self.min_lat.min(other.min_lat);
        self.max_lat = self.max_lat.max(other.max_lat);
        self.min_lon = self.min_lon.min(other.min_lon);
        self.max_lon = self.max_lon.max(other.max_lon);
    }

    /// Get the center point of the bounds as (lat, lon).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Get the width of the bounds in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Get the height of the bounds in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Area in square degrees.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True for points and lines.
    pub fn is_degenerate(&self) -> bool {
        self.area() <= 0.0
    }

    /// Closed-box intersection test. Touching edges count.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
    }

    /// True if `other` lies fully inside this box (closed).
    pub fn contains(&self, other: &GeoBounds) -> bool {
        self.min_lat <= other.min_lat
            && other.max_lat <= self.max_lat
            && self.min_lon <= other.min_lon
            && other.max_lon <= self.max_lon
    }

    /// The box as a closed polygon (x = longitude, y = latitude).
    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::new(
            Coord {
                x: self.min_lon,
                y: self.min_lat,
            },
            Coord {
                x: self.max_lon,
                y: self.max_lat,
            },
        )
        .to_polygon()
    }

    /// Bounds of a rectangle in polygon coordinates.
    pub(super) fn from_rect(rect: Rect<f64>) -> Self {
        Self {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lon: rect.min().x,
            max_lon: rect.max().x,
        }
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min_lat == self.max_lat && self.min_lon == self.max_lon {
            return write!(f, "({}, {})", self.min_lat, self.min_lon);
        }
        write!(
            f,
            "[{}..{}, {}..{}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}
