//! Geographic extents.
//!
//! A [`GeoRegion`] is a set of polygons (possibly with holes) plus isolated
//! points, backed by the `geo` crate. Subtraction, intersection and union are
//! polygon clipping, so the residual of any region minus any other region is
//! again a region. [`GeoBounds`] boxes are the validated way to build
//! rectangular regions and points.
//!
//! # Predicates
//!
//! - **Intersects**: the closed regions share at least one point
//! - **Equals**: topological equality, whatever the ring layout

mod bounds;
mod region;

pub use bounds::{GeoBounds, GeoError, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
pub use region::GeoRegion;
