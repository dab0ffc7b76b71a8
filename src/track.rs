//! Ray tracking across region boundaries.
//!
//! [`Tree::track_surf`] is the navigation primitive for stepping a particle
//! through a cell complex: given a position and a direction, it finds the
//! nearest point along the ray where the region's validity flips.

use std::collections::BTreeSet;

use log::trace;
use nalgebra::{Point3, Vector3};

use crate::error::LookupError;
use crate::eval::MAX_REGION_DEPTH;
use crate::geometry::Geometry;
use crate::tree::Tree;
use crate::types::SurfId;

/// Tolerances for [`Tree::track_surf`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TrackConfig {
    /// Crossings closer than this are ignored, which excludes the surface the
    /// ray is just leaving.
    pub min_distance: f64,
    /// Step used to probe which side of a surface the ray enters.
    pub probe_step: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            min_distance: 1e-6,
            probe_step: 1e-5,
        }
    }
}

/// The nearest boundary crossing along a ray.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Crossing {
    /// The crossed surface, signed by the side the ray enters.
    pub surface: SurfId,
    pub distance: f64,
    pub point: Point3<f64>,
}

impl Tree {
    /// Finds the nearest crossing of the region boundary along the ray from
    /// `origin` in `direction`, using [`TrackConfig::default`].
    ///
    /// Returns `None` if the ray never crosses the boundary.
    pub fn track_surf<G>(&self, geometry: &G, origin: &Point3<f64>, direction: &Vector3<f64>) -> Result<Option<Crossing>, LookupError>
    where
        G: Geometry + ?Sized,
    {
        self.track_surf_with(geometry, origin, direction, &TrackConfig::default())
    }

    /// Like [`Tree::track_surf`] with explicit tolerances.
    ///
    /// `direction` need not be a unit vector: it is normalized first, so
    /// [`Crossing::distance`] and [`TrackConfig::min_distance`] are lengths.
    /// A zero direction crosses nothing.
    ///
    /// Every surface the rule depends on (including the surfaces of
    /// referenced regions) is intersected with the ray. A candidate crossing
    /// counts only if forcing the surface to either side at the crossing
    /// point gives different validity, i.e. the surface really bounds the
    /// region there.
    pub fn track_surf_with<G>(
        &self,
        geometry: &G,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        config: &TrackConfig,
    ) -> Result<Option<Crossing>, LookupError>
    where
        G: Geometry + ?Sized,
    {
        let Some(direction) = direction.try_normalize(f64::EPSILON) else {
            return Ok(None);
        };
        let direction = &direction;
        let mut best: Option<Crossing> = None;

        for surface in self.tracked_surfaces(geometry)? {
            let id = SurfId::from_surface(surface).ok_or(LookupError::Surface(surface))?;
            for (distance, point) in geometry.line_intersections(surface, origin, direction)? {
                if distance <= config.min_distance || best.is_some_and(|b| distance >= b.distance) {
                    continue;
                }
                let (plus, minus) = self.pair_valid(geometry, &point, surface)?;
                if plus == minus {
                    trace!("track: surface {} at {:.6} does not bound the region", surface, distance);
                    continue;
                }
                let Some(entering_positive) = geometry.side_direction(surface, &point, direction, config.probe_step)? else {
                    trace!("track: surface {} at {:.6} is tangent", surface, distance);
                    continue;
                };
                let signed = if entering_positive { id } else { -id };
                trace!("track: candidate {} at {:.6}", signed, distance);
                best = Some(Crossing {
                    surface: signed,
                    distance,
                    point,
                });
            }
        }

        Ok(best)
    }

    /// Surfaces of this rule and, transitively, of every region it references.
    fn tracked_surfaces<G>(&self, geometry: &G) -> Result<BTreeSet<u32>, LookupError>
    where
        G: Geometry + ?Sized,
    {
        let mut surfaces = self.surface_ids();
        let mut pending: Vec<(u32, usize)> = self.region_ids().into_iter().map(|r| (r, 1)).collect();
        let mut seen = BTreeSet::new();
        while let Some((region, depth)) = pending.pop() {
            if !seen.insert(region) {
                continue;
            }
            if depth > MAX_REGION_DEPTH {
                return Err(LookupError::RegionNesting { region, depth });
            }
            let tree = geometry.region(region)?;
            surfaces.extend(tree.surface_ids());
            pending.extend(tree.region_ids().into_iter().map(|r| (r, depth + 1)));
        }
        Ok(surfaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::geometry::{Plane, PlaneSet};
    use crate::parser::parse;

    fn unit_box() -> PlaneSet {
        PlaneSet::new()
            .with(1, Plane::py(-1.0))
            .with(2, Plane::py(1.0))
            .with(3, Plane::px(-1.0))
            .with(4, Plane::px(1.0))
            .with(5, Plane::pz(-1.0))
            .with(6, Plane::pz(1.0))
    }

    #[test]
    fn test_track_out_of_box() {
        let planes = unit_box();
        let tree = parse("1 -2 3 -4 5 -6").unwrap();
        let hit = tree
            .track_surf(&planes, &Point3::new(0.0, 0.25, 0.0), &Vector3::y())
            .unwrap()
            .unwrap();
        assert_eq!(hit.surface, SurfId::new(2));
        assert!((hit.distance - 0.75).abs() < 1e-9);

        let hit = tree
            .track_surf(&planes, &Point3::origin(), &-Vector3::x())
            .unwrap()
            .unwrap();
        assert_eq!(hit.surface, SurfId::new(-3));
        assert!((hit.distance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_scaled_direction() {
        let planes = unit_box();
        let tree = parse("1 -2 3 -4 5 -6").unwrap();
        let origin = Point3::new(0.0, 0.6, 0.0);
        let config = TrackConfig {
            min_distance: 0.3,
            ..TrackConfig::default()
        };
        let hit = tree
            .track_surf_with(&planes, &origin, &(Vector3::y() * 2.0), &config)
            .unwrap()
            .unwrap();
        assert_eq!(hit.surface, SurfId::new(2));
        assert!((hit.distance - 0.4).abs() < 1e-9);
        assert!((hit.point.y - 1.0).abs() < 1e-9);

        assert_eq!(tree.track_surf(&planes, &origin, &Vector3::zeros()), Ok(None));
    }

    #[test]
    fn test_track_into_box() {
        let planes = unit_box();
        let tree = parse("1 -2 3 -4 5 -6").unwrap();
        let hit = tree
            .track_surf(&planes, &Point3::new(0.0, -5.0, 0.0), &Vector3::y())
            .unwrap()
            .unwrap();
        assert_eq!(hit.surface, SurfId::new(1));
        assert!((hit.distance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_skips_plane_outside_the_face() {
        let planes = unit_box();
        let tree = parse("1 -2 3 -4 5 -6").unwrap();
        // Moving along +y at x = 3: plane 2 is crossed, but not on the box.
        let miss = tree
            .track_surf(&planes, &Point3::new(3.0, 0.0, 0.0), &Vector3::y())
            .unwrap();
        assert_eq!(miss, None);
    }

    #[test]
    fn test_track_ignores_departed_surface() {
        let planes = unit_box();
        let tree = parse("1 -2 3 -4 5 -6").unwrap();
        let hit = tree
            .track_surf(&planes, &Point3::new(0.0, -1.0, 0.0), &Vector3::y())
            .unwrap()
            .unwrap();
        assert_eq!(hit.surface, SurfId::new(2));
        assert!((hit.distance - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_through_region_reference() {
        let mut planes = unit_box();
        planes.insert(7, Plane::py(5.0));
        planes.insert_region(20, parse("1 -2 3 -4 5 -6").unwrap());
        // Slab below y = 5 with the box cut out.
        let tree = parse("-7 #20").unwrap();
        let hit = tree
            .track_surf(&planes, &Point3::new(0.0, -3.0, 0.0), &Vector3::y())
            .unwrap()
            .unwrap();
        assert_eq!(hit.surface, SurfId::new(1));
        assert!((hit.distance - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_config() {
        let planes = unit_box();
        let tree = parse("1 -2").unwrap();
        let config = TrackConfig {
            min_distance: 0.5,
            ..TrackConfig::default()
        };
        let hit = tree
            .track_surf_with(&planes, &Point3::new(0.0, 0.7, 0.0), &Vector3::y(), &config)
            .unwrap();
        assert_eq!(hit, None);
    }
}
