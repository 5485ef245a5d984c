//! Regions as polygon sets plus isolated points.

use std::fmt;

use geo::{
    Area, BooleanOps, BoundingRect, Coord, Intersects, LineString, MultiPolygon, Point, Polygon,
    Relate,
};

use super::bounds::check_coordinate;
use super::{GeoBounds, GeoError};

/// Polygons with less area than this, in square degrees, are dropped from
/// boolean results.
const AREA_EPSILON: f64 = 1e-10;

/// A geographic region: a set of polygons (with holes) and a set of points
/// lying outside them.
///
/// Coordinates follow the `geo` convention of x = longitude, y = latitude.
/// Area operations are exact polygon clipping; points are kept only where
/// no polygon already covers them.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRegion {
    area: MultiPolygon<f64>,
    points: Vec<Point<f64>>,
}

impl Default for GeoRegion {
    fn default() -> Self {
        Self::empty()
    }
}

impl GeoRegion {
    /// The empty region.
    pub fn empty() -> Self {
        Self {
            area: MultiPolygon::new(Vec::new()),
            points: Vec::new(),
        }
    }

    /// The whole globe.
    pub fn world() -> Self {
        Self::from_bounds(GeoBounds::WORLD)
    }

    /// A box. A box without area is kept as its corner points.
    pub fn from_bounds(bounds: GeoBounds) -> Self {
        if bounds.is_degenerate() {
            let corners = [
                Point::new(bounds.min_lon, bounds.min_lat),
                Point::new(bounds.max_lon, bounds.max_lat),
            ];
            return Self::assemble(MultiPolygon::new(Vec::new()), corners.to_vec());
        }
        Self {
            area: MultiPolygon::new(vec![bounds.to_polygon()]),
            points: Vec::new(),
        }
    }

    /// Union of boxes, which may overlap.
    pub fn from_boxes<I>(boxes: I) -> Self
    where
        I: IntoIterator<Item = GeoBounds>,
    {
        boxes
            .into_iter()
            .fold(Self::empty(), |acc, b| acc.union(&Self::from_bounds(b)))
    }

    /// A single point.
    pub fn point(lat: f64, lon: f64) -> Result<Self, GeoError> {
        GeoBounds::from_point(lat, lon).map(Self::from_bounds)
    }

    /// A simple polygon from `(lat, lon)` vertices. The ring is closed
    /// automatically.
    pub fn polygon(vertices: &[(f64, f64)]) -> Result<Self, GeoError> {
        let ring: Vec<Coord<f64>> = vertices
            .iter()
            .map(|&(lat, lon)| Coord { x: lon, y: lat })
            .collect();
        Self::from_polygon(Polygon::new(LineString::new(ring), Vec::new()))
    }

    /// Wrap a `geo` polygon, validating its coordinates and area.
    pub fn from_polygon(polygon: Polygon<f64>) -> Result<Self, GeoError> {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for coord in rings.flat_map(|ring| ring.coords()) {
            check_coordinate(coord.y, coord.x)?;
        }
        if polygon.exterior().0.len() < 4 || polygon.unsigned_area() <= AREA_EPSILON {
            return Err(GeoError::DegeneratePolygon(format!(
                "{} vertices enclosing no area",
                polygon.exterior().0.len().saturating_sub(1)
            )));
        }
        // Self-union resolves overlapping or mis-oriented rings.
        let area = MultiPolygon::new(vec![polygon]);
        Ok(Self::assemble(area.union(&MultiPolygon::new(Vec::new())), Vec::new()))
    }

    /// Union of `geo` polygons.
    pub fn from_multi_polygon(polygons: MultiPolygon<f64>) -> Result<Self, GeoError> {
        polygons.0.into_iter().try_fold(Self::empty(), |acc, p| {
            Ok(acc.union(&Self::from_polygon(p)?))
        })
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.area
    }

    pub fn points(&self) -> &[Point<f64>] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.area.0.is_empty() && self.points.is_empty()
    }

    /// Total area in square degrees.
    pub fn area(&self) -> f64 {
        self.area.unsigned_area()
    }

    /// Smallest box enclosing the region.
    pub fn bounds(&self) -> Option<GeoBounds> {
        let mut bounds = self.area.bounding_rect().map(GeoBounds::from_rect);
        for p in &self.points {
            let b = GeoBounds {
                min_lat: p.y(),
                max_lat: p.y(),
                min_lon: p.x(),
                max_lon: p.x(),
            };
            match bounds.as_mut() {
                Some(existing) => existing.expand(&b),
                None => bounds = Some(b),
            }
        }
        bounds
    }

    /// Spatial INTERSECTS: the closed regions share at least one point.
    pub fn intersects(&self, other: &GeoRegion) -> bool {
        let areas = !self.area.0.is_empty()
            && !other.area.0.is_empty()
            && self.area.intersects(&other.area);
        areas
            || self.points.iter().any(|p| other.contains_point(p))
            || other.points.iter().any(|p| self.area.intersects(p))
    }

    /// True if every part of `other` lies within this region.
    pub fn covers(&self, other: &GeoRegion) -> bool {
        other.subtract(self).is_empty()
    }

    /// Spatial EQUALS: topological equality, independent of how either
    /// region's rings are laid out.
    pub fn equals(&self, other: &GeoRegion) -> bool {
        let same_points = self.points.len() == other.points.len()
            && self.points.iter().all(|p| other.points.contains(p));
        if !same_points {
            return false;
        }
        match (self.area.0.is_empty(), other.area.0.is_empty()) {
            (true, true) => true,
            (false, false) => self.area.relate(&other.area).is_equal_topo(),
            _ => false,
        }
    }

    /// Residual of this region after removing `other`.
    pub fn subtract(&self, other: &GeoRegion) -> GeoRegion {
        let area = if self.area.0.is_empty() || other.area.0.is_empty() {
            self.area.clone()
        } else {
            self.area.difference(&other.area)
        };
        let points = self
            .points
            .iter()
            .filter(|p| !other.contains_point(p))
            .copied()
            .collect();
        Self::assemble(area, points)
    }

    /// Part of this region also inside `other`.
    pub fn intersection(&self, other: &GeoRegion) -> GeoRegion {
        let area = if self.area.0.is_empty() || other.area.0.is_empty() {
            MultiPolygon::new(Vec::new())
        } else {
            self.area.intersection(&other.area)
        };
        let mut points: Vec<Point<f64>> = self
            .points
            .iter()
            .filter(|p| other.contains_point(p))
            .copied()
            .collect();
        points.extend(
            other
                .points
                .iter()
                .filter(|p| self.area.intersects(*p))
                .copied(),
        );
        Self::assemble(area, points)
    }

    pub fn union(&self, other: &GeoRegion) -> GeoRegion {
        let area = if other.area.0.is_empty() {
            self.area.clone()
        } else if self.area.0.is_empty() {
            other.area.clone()
        } else {
            self.area.union(&other.area)
        };
        let mut points = self.points.clone();
        points.extend(other.points.iter().copied());
        Self::assemble(area, points)
    }

    /// Closed containment of a single point.
    fn contains_point(&self, point: &Point<f64>) -> bool {
        self.points.contains(point) || self.area.intersects(point)
    }

    /// Drop clipping slivers and points already inside the area.
    fn assemble(area: MultiPolygon<f64>, points: Vec<Point<f64>>) -> Self {
        let area = MultiPolygon::new(
            area.0
                .into_iter()
                .filter(|p| p.unsigned_area() > AREA_EPSILON)
                .collect(),
        );
        let mut kept: Vec<Point<f64>> = Vec::with_capacity(points.len());
        for p in points {
            if !kept.contains(&p) && !area.intersects(&p) {
                kept.push(p);
            }
        }
        Self { area, points: kept }
    }
}

impl From<GeoBounds> for GeoRegion {
    fn from(bounds: GeoBounds) -> Self {
        Self::from_bounds(bounds)
    }
}

impl fmt::Display for GeoRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        let mut first = true;
        for polygon in self.area.iter() {
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            write!(f, "POLYGON(")?;
            for (i, c) in polygon.exterior().coords().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} {}", c.y, c.x)?;
            }
            write!(f, ")")?;
            let holes = polygon.interiors().len();
            if holes > 0 {
                write!(f, " minus {} hole(s)", holes)?;
            }
        }
        for p in &self.points {
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            write!(f, "({}, {})", p.y(), p.x())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> GeoRegion {
        GeoRegion::from_bounds(GeoBounds::new(min_lat, max_lat, min_lon, max_lon).unwrap())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_subtract_and_reunion_preserves_area() {
        let requested = region(0.0, 10.0, 0.0, 10.0);
        let covered = region(5.0, 15.0, 5.0, 15.0);

        let remainder = requested.subtract(&covered);
        let overlap = requested.intersection(&covered);

        assert_close(remainder.area() + overlap.area(), requested.area());
        assert_close(remainder.intersection(&overlap).area(), 0.0);
        assert!(remainder.union(&overlap).equals(&requested));
    }

    #[test]
    fn test_hole_is_kept_as_interior_ring() {
        let outer = region(0.0, 10.0, 0.0, 10.0);
        let hole = region(4.0, 6.0, 4.0, 6.0);

        let ring = outer.subtract(&hole);
        assert_close(ring.area(), 96.0);
        assert_eq!(ring.polygons().0.len(), 1);
        assert_eq!(ring.polygons().0[0].interiors().len(), 1);
        assert!(!ring.intersects(&GeoRegion::point(5.0, 5.0).unwrap()));
        assert!(ring.intersects(&GeoRegion::point(4.0, 5.0).unwrap()));
    }

    #[test]
    fn test_subtract_everything() {
        let requested = region(0.0, 1.0, 0.0, 1.0);
        assert!(requested.subtract(&GeoRegion::world()).is_empty());
        assert!(requested.subtract(&requested).is_empty());
    }

    #[test]
    fn test_equals_with_different_decomposition() {
        let whole = region(0.0, 2.0, 0.0, 2.0);
        let split = GeoRegion::from_boxes(vec![
            GeoBounds::new(0.0, 1.0, 0.0, 2.0).unwrap(),
            GeoBounds::new(1.0, 2.0, 0.0, 2.0).unwrap(),
        ]);
        assert!(whole.equals(&split));
        assert!(!whole.equals(&region(0.0, 2.0, 0.0, 1.0)));
    }

    #[test]
    fn test_triangle_is_not_its_bounding_box() {
        // lat + lon <= 10 in the first quadrant
        let triangle = GeoRegion::polygon(&[(0.0, 0.0), (0.0, 10.0), (10.0, 0.0)]).unwrap();
        let far_corner = region(6.0, 10.0, 6.0, 10.0);

        assert_close(triangle.area(), 50.0);
        assert!(!triangle.intersects(&far_corner));
        assert_eq!(triangle.bounds(), Some(GeoBounds::new(0.0, 10.0, 0.0, 10.0).unwrap()));

        let square = region(0.0, 10.0, 0.0, 10.0);
        let rest = square.subtract(&triangle);
        let mirrored = GeoRegion::polygon(&[(10.0, 10.0), (0.0, 10.0), (10.0, 0.0)]).unwrap();
        assert_close(rest.area(), 50.0);
        assert!(rest.equals(&mirrored));
        assert!(rest.intersects(&far_corner));
        assert!(!rest.intersects(&GeoRegion::point(1.0, 1.0).unwrap()));
    }

    #[test]
    fn test_polygon_validation() {
        assert!(matches!(
            GeoRegion::polygon(&[(0.0, 0.0), (95.0, 0.0), (0.0, 10.0)]),
            Err(GeoError::InvalidLatitude(_))
        ));
        assert!(matches!(
            GeoRegion::polygon(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]),
            Err(GeoError::DegeneratePolygon(_))
        ));
        assert!(matches!(
            GeoRegion::polygon(&[(0.0, 0.0), (1.0, 1.0)]),
            Err(GeoError::DegeneratePolygon(_))
        ));
    }

    #[test]
    fn test_intersects_and_points() {
        let area = region(0.0, 2.0, 0.0, 2.0);
        let inside = GeoRegion::point(1.0, 1.0).unwrap();
        let outside = GeoRegion::point(3.0, 3.0).unwrap();

        assert!(area.intersects(&inside));
        assert!(!area.intersects(&outside));
        assert!(area.covers(&inside));
        assert!(!inside.equals(&area));
        assert!(inside.equals(&inside.clone()));
        assert!(inside.subtract(&area).is_empty());
        assert_eq!(outside.subtract(&area), outside);
    }

    #[test]
    fn test_union_absorbs_covered_points() {
        let area = region(0.0, 2.0, 0.0, 2.0);
        let merged = area
            .union(&GeoRegion::point(1.0, 1.0).unwrap())
            .union(&GeoRegion::point(5.0, 5.0).unwrap());
        assert_eq!(merged.points().len(), 1);
        assert_eq!(merged.points()[0], Point::new(5.0, 5.0));
    }

    #[test]
    fn test_overlapping_boxes_are_merged() {
        let overlapping = GeoRegion::from_boxes(vec![
            GeoBounds::new(0.0, 2.0, 0.0, 2.0).unwrap(),
            GeoBounds::new(1.0, 3.0, 1.0, 3.0).unwrap(),
        ]);
        assert_close(overlapping.area(), 4.0 + 4.0 - 1.0);
    }

    #[test]
    fn test_bounds() {
        let r = GeoRegion::from_boxes(vec![
            GeoBounds::new(0.0, 1.0, 0.0, 1.0).unwrap(),
            GeoBounds::new(5.0, 6.0, -3.0, -2.0).unwrap(),
        ]);
        assert_eq!(
            r.bounds(),
            Some(GeoBounds::new(0.0, 6.0, -3.0, 1.0).unwrap())
        );
        assert_eq!(GeoRegion::empty().bounds(), None);
    }
}
