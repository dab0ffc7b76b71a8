//! Collaborator interfaces supplied by the surrounding geometry system.
//!
//! The rule engine never does surface math itself. It asks a [`Geometry`]
//! which side of a surface a point lies on, where a ray crosses a surface,
//! and what rule defines a named region. Complementing a whole rule goes
//! through an [`ExpressionNegator`].
//!
//! [`PlaneSet`] and [`DeMorganNegator`] are small reference implementations,
//! enough to drive the engine in tests and demos.

use std::collections::BTreeMap;

use nalgebra::{Point3, Vector3};

use crate::error::LookupError;
use crate::parser::parse;
use crate::tree::Tree;
use crate::types::RegionId;

/// Position of a point relative to a surface.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Side {
    Positive,
    Negative,
    OnBoundary,
}

impl Side {
    /// Whether a leaf with the given polarity holds on this side.
    ///
    /// A point on the boundary satisfies both polarities.
    pub fn satisfies(self, positive: bool) -> bool {
        match self {
            Side::Positive => positive,
            Side::Negative => !positive,
            Side::OnBoundary => true,
        }
    }
}

pub trait Geometry {
    /// Side of `surface` that `point` lies on.
    fn side(&self, surface: u32, point: &Point3<f64>) -> Result<Side, LookupError>;

    /// Crossings of the line `origin + t * direction` with `surface`, as
    /// `(t, point)` pairs. Negative `t` values are allowed.
    fn line_intersections(
        &self,
        surface: u32,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Result<Vec<(f64, Point3<f64>)>, LookupError>;

    /// Which side of `surface` a ray moving along `direction` enters at
    /// `point`: `Some(true)` for the positive side, `None` if tangent.
    ///
    /// The default probes the sides a short `step` ahead and behind.
    fn side_direction(
        &self,
        surface: u32,
        point: &Point3<f64>,
        direction: &Vector3<f64>,
        step: f64,
    ) -> Result<Option<bool>, LookupError> {
        match self.side(surface, &(point + direction * step))? {
            Side::Positive => Ok(Some(true)),
            Side::Negative => Ok(Some(false)),
            Side::OnBoundary => match self.side(surface, &(point - direction * step))? {
                Side::Positive => Ok(Some(false)),
                Side::Negative => Ok(Some(true)),
                Side::OnBoundary => Ok(None),
            },
        }
    }

    /// The rule of a named region referenced by `#N` or `%N`.
    fn region(&self, region: RegionId) -> Result<&Tree, LookupError> {
        Err(LookupError::Region(region))
    }
}

/// Text-to-text negation of a rule expression.
pub trait ExpressionNegator {
    fn negate(&self, text: &str) -> Result<String, LookupError>;
}

/// Negates by parsing, pushing the negation down to the leaves, and
/// serializing again.
#[derive(Debug, Default, Copy, Clone)]
pub struct DeMorganNegator;

impl ExpressionNegator for DeMorganNegator {
    fn negate(&self, text: &str) -> Result<String, LookupError> {
        let tree = parse(text).map_err(|e| LookupError::Negation(e.to_string()))?;
        let negated = tree.complement_of().map_err(|e| LookupError::Negation(e.to_string()))?;
        Ok(negated.display())
    }
}

/// The plane `normal . x = distance`; its positive side is where the normal
/// points.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub distance: f64,
}

impl Plane {
    /// Creates a plane, normalizing `normal`.
    pub fn new(normal: Vector3<f64>, distance: f64) -> Self {
        let norm = normal.norm();
        Self {
            normal: normal / norm,
            distance: distance / norm,
        }
    }

    /// Plane `x = value`.
    pub fn px(value: f64) -> Self {
        Self::new(Vector3::x(), value)
    }

    /// Plane `y = value`.
    pub fn py(value: f64) -> Self {
        Self::new(Vector3::y(), value)
    }

    /// Plane `z = value`.
    pub fn pz(value: f64) -> Self {
        Self::new(Vector3::z(), value)
    }

    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.distance
    }
}

/// A registry of planes and named regions.
#[derive(Debug, Clone)]
pub struct PlaneSet {
    planes: BTreeMap<u32, Plane>,
    regions: BTreeMap<RegionId, Tree>,
    tolerance: f64,
}

impl Default for PlaneSet {
    fn default() -> Self {
        Self {
            planes: BTreeMap::new(),
            regions: BTreeMap::new(),
            tolerance: 1e-9,
        }
    }
}

impl PlaneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance below which a point counts as on a plane.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn insert(&mut self, id: u32, plane: Plane) -> Option<Plane> {
        self.planes.insert(id, plane)
    }

    pub fn with(mut self, id: u32, plane: Plane) -> Self {
        self.insert(id, plane);
        self
    }

    pub fn insert_region(&mut self, id: RegionId, tree: Tree) -> Option<Tree> {
        self.regions.insert(id, tree)
    }

    pub fn plane(&self, id: u32) -> Result<&Plane, LookupError> {
        self.planes.get(&id).ok_or(LookupError::Surface(id))
    }
}

impl Geometry for PlaneSet {
    fn side(&self, surface: u32, point: &Point3<f64>) -> Result<Side, LookupError> {
        let d = self.plane(surface)?.signed_distance(point);
        Ok(if d > self.tolerance {
            Side::Positive
        } else if d < -self.tolerance {
            Side::Negative
        } else {
            Side::OnBoundary
        })
    }

    fn line_intersections(
        &self,
        surface: u32,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Result<Vec<(f64, Point3<f64>)>, LookupError> {
        let plane = self.plane(surface)?;
        let denom = plane.normal.dot(direction);
        if denom.abs() < self.tolerance {
            return Ok(Vec::new());
        }
        let t = -plane.signed_distance(origin) / denom;
        Ok(vec![(t, origin + direction * t)])
    }

    fn side_direction(
        &self,
        surface: u32,
        _point: &Point3<f64>,
        direction: &Vector3<f64>,
        _step: f64,
    ) -> Result<Option<bool>, LookupError> {
        let dot = self.plane(surface)?.normal.dot(direction);
        Ok(if dot > self.tolerance {
            Some(true)
        } else if dot < -self.tolerance {
            Some(false)
        } else {
            None
        })
    }

    fn region(&self, region: RegionId) -> Result<&Tree, LookupError> {
        self.regions.get(&region).ok_or(LookupError::Region(region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_side() {
        let planes = PlaneSet::new().with(1, Plane::px(2.0));
        assert_eq!(planes.side(1, &Point3::new(3.0, 0.0, 0.0)), Ok(Side::Positive));
        assert_eq!(planes.side(1, &Point3::new(1.0, 5.0, 0.0)), Ok(Side::Negative));
        assert_eq!(planes.side(1, &Point3::new(2.0, 5.0, 0.0)), Ok(Side::OnBoundary));
        assert_eq!(planes.side(2, &Point3::origin()), Err(LookupError::Surface(2)));
    }

    #[test]
    fn test_plane_normalized() {
        let p = Plane::new(Vector3::new(0.0, 2.0, 0.0), 4.0);
        assert_eq!(p.normal, Vector3::y());
        assert_eq!(p.distance, 2.0);
    }

    #[test]
    fn test_line_intersections() {
        let planes = PlaneSet::new().with(1, Plane::py(1.0));
        let hits = planes
            .line_intersections(1, &Point3::origin(), &Vector3::new(0.0, 2.0, 0.0))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].0 - 0.5).abs() < 1e-12);
        assert!((hits[0].1.y - 1.0).abs() < 1e-12);
        let parallel = planes.line_intersections(1, &Point3::origin(), &Vector3::x()).unwrap();
        assert!(parallel.is_empty());
    }

    #[test]
    fn test_side_direction() {
        let planes = PlaneSet::new().with(1, Plane::px(0.0));
        let p = Point3::origin();
        assert_eq!(planes.side_direction(1, &p, &Vector3::x(), 1e-5), Ok(Some(true)));
        assert_eq!(planes.side_direction(1, &p, &-Vector3::x(), 1e-5), Ok(Some(false)));
        assert_eq!(planes.side_direction(1, &p, &Vector3::y(), 1e-5), Ok(None));
    }

    #[test]
    fn test_side_satisfies() {
        assert!(Side::Positive.satisfies(true));
        assert!(!Side::Positive.satisfies(false));
        assert!(Side::Negative.satisfies(false));
        assert!(Side::OnBoundary.satisfies(true));
        assert!(Side::OnBoundary.satisfies(false));
    }

    #[test]
    fn test_de_morgan_negator() {
        assert_eq!(DeMorganNegator.negate("3 -4"), Ok("(-3 : 4)".to_string()));
        assert!(matches!(DeMorganNegator.negate("3 ("), Err(LookupError::Negation(_))));
    }

    #[test]
    fn test_unknown_region() {
        let planes = PlaneSet::new();
        assert_eq!(planes.region(4).err(), Some(LookupError::Region(4)));
    }
}
