//! Point-containment evaluation.
//!
//! A rule is evaluated bottom-up with short-circuiting: an intersection holds
//! if both children hold, a union if either does. Surface leaves ask the
//! [`Geometry`] for the side of the point; region leaves evaluate the
//! referenced region's rule at the same point.
//!
//! Several variants override the geometric answer for chosen surfaces. They
//! are needed when a point lies exactly on a boundary, where the geometric
//! test cannot tell the two sides apart.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Point3;

use crate::error::LookupError;
use crate::geometry::Geometry;
use crate::node::Node;
use crate::tree::{Body, Tree};
use crate::types::{RegionId, SurfId};

/// Maximum nesting of `#N` / `%N` region references during evaluation.
pub const MAX_REGION_DEPTH: usize = 64;

/// Evaluates `node`, answering leaves with `leaf`.
///
/// Runs on an explicit stack of pending right operands. Once the left side of
/// a binary node is known, the node either short-circuits to that value or
/// takes the value of its right side, so the node itself need not be kept.
pub(crate) fn evaluate<F, E>(node: &Node, leaf: &mut F) -> Result<bool, E>
where
    F: FnMut(&Node) -> Result<bool, E>,
{
    // (is_union, right operand)
    let mut pending: Vec<(bool, &Node)> = Vec::new();
    let mut current = node;
    loop {
        let value = loop {
            match current {
                Node::Intersection(l, r) => {
                    pending.push((false, &**r));
                    current = &**l;
                }
                Node::Union(l, r) => {
                    pending.push((true, &**r));
                    current = &**l;
                }
                Node::Leaf(_) | Node::Complement(_) | Node::Container(_) => break leaf(current)?,
            }
        };
        loop {
            match pending.pop() {
                None => return Ok(value),
                Some((is_union, _)) if value == is_union => {}
                Some((_, right)) => {
                    current = right;
                    break;
                }
            }
        }
    }
}

#[derive(Debug, Default, Copy, Clone)]
struct Overrides<'a> {
    forced: Option<&'a BTreeMap<u32, bool>>,
    nominated: Option<SurfId>,
    excluded: Option<&'a BTreeSet<u32>>,
}

impl Overrides<'_> {
    fn surface<G>(&self, geometry: &G, id: SurfId, point: &Point3<f64>) -> Result<bool, LookupError>
    where
        G: Geometry + ?Sized,
    {
        let surface = id.surface();
        if self.excluded.is_some_and(|set| set.contains(&surface)) {
            return Ok(true);
        }
        if let Some(nominated) = self.nominated.filter(|n| n.surface() == surface) {
            return Ok(nominated.is_positive() == id.is_positive());
        }
        if let Some(&positive) = self.forced.and_then(|map| map.get(&surface)) {
            return Ok(positive == id.is_positive());
        }
        Ok(geometry.side(surface, point)?.satisfies(id.is_positive()))
    }
}

fn body_valid<G>(body: &Body, geometry: &G, point: &Point3<f64>, rules: Overrides<'_>, depth: usize) -> Result<bool, LookupError>
where
    G: Geometry + ?Sized,
{
    match body {
        Body::Empty => Ok(true),
        Body::Constant(value) => Ok(*value),
        Body::Rule(node) => node_valid(node, geometry, point, rules, depth),
    }
}

fn node_valid<G>(node: &Node, geometry: &G, point: &Point3<f64>, rules: Overrides<'_>, depth: usize) -> Result<bool, LookupError>
where
    G: Geometry + ?Sized,
{
    evaluate(node, &mut |leaf: &Node| match leaf {
        Node::Leaf(id) => rules.surface(geometry, *id, point),
        Node::Complement(region) => Ok(!region_valid(*region, geometry, point, rules, depth)?),
        Node::Container(region) => region_valid(*region, geometry, point, rules, depth),
        Node::Intersection(_, _) | Node::Union(_, _) => node_valid(leaf, geometry, point, rules, depth),
    })
}

fn region_valid<G>(region: RegionId, geometry: &G, point: &Point3<f64>, rules: Overrides<'_>, depth: usize) -> Result<bool, LookupError>
where
    G: Geometry + ?Sized,
{
    if depth >= MAX_REGION_DEPTH {
        return Err(LookupError::RegionNesting { region, depth });
    }
    let tree = geometry.region(region)?;
    body_valid(tree.body(), geometry, point, rules, depth + 1)
}

impl Tree {
    /// Whether `point` lies inside the region described by this rule.
    ///
    /// An empty tree is valid everywhere.
    pub fn is_valid<G>(&self, geometry: &G, point: &Point3<f64>) -> Result<bool, LookupError>
    where
        G: Geometry + ?Sized,
    {
        body_valid(self.body(), geometry, point, Overrides::default(), 0)
    }

    /// Like [`Tree::is_valid`], but surfaces in `forced` take the given side
    /// (`true` for positive) instead of the geometric one.
    pub fn is_valid_with<G>(&self, geometry: &G, point: &Point3<f64>, forced: &BTreeMap<u32, bool>) -> Result<bool, LookupError>
    where
        G: Geometry + ?Sized,
    {
        let rules = Overrides {
            forced: Some(forced),
            ..Overrides::default()
        };
        body_valid(self.body(), geometry, point, rules, 0)
    }

    /// Like [`Tree::is_valid`], but every leaf on a surface in `excluded`
    /// counts as satisfied.
    pub fn is_valid_excluding<G>(&self, geometry: &G, point: &Point3<f64>, excluded: &BTreeSet<u32>) -> Result<bool, LookupError>
    where
        G: Geometry + ?Sized,
    {
        let rules = Overrides {
            excluded: Some(excluded),
            ..Overrides::default()
        };
        body_valid(self.body(), geometry, point, rules, 0)
    }

    /// Validity at `point` with the nominated surface forced to the side
    /// given by its sign; all other surfaces are tested geometrically.
    pub fn is_direction_valid<G>(&self, geometry: &G, point: &Point3<f64>, surface: SurfId) -> Result<bool, LookupError>
    where
        G: Geometry + ?Sized,
    {
        let rules = Overrides {
            nominated: Some(surface),
            ..Overrides::default()
        };
        body_valid(self.body(), geometry, point, rules, 0)
    }

    /// Validity at `point` with `surface` forced to its positive side and to
    /// its negative side, in that order.
    ///
    /// The two differ exactly when `surface` bounds the region at `point`.
    pub fn pair_valid<G>(&self, geometry: &G, point: &Point3<f64>, surface: u32) -> Result<(bool, bool), LookupError>
    where
        G: Geometry + ?Sized,
    {
        let id = SurfId::from_surface(surface).ok_or(LookupError::Surface(surface))?;
        Ok((
            self.is_direction_valid(geometry, point, id)?,
            self.is_direction_valid(geometry, point, -id)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::geometry::{Plane, PlaneSet};
    use crate::node::Node;
    use crate::parser::parse;

    /// Unit box: 1/2 bound y, 3/4 bound x, 5/6 bound z.
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
    fn test_box_containment() {
        let planes = unit_box();
        let tree = parse("1 -2 3 -4 5 -6").unwrap();
        assert!(tree.is_valid(&planes, &Point3::origin()).unwrap());
        assert!(!tree.is_valid(&planes, &Point3::new(0.0, 2.0, 0.0)).unwrap());
        assert!(!tree.is_valid(&planes, &Point3::new(-3.0, 0.0, 0.0)).unwrap());
        // On the face both signs hold.
        assert!(tree.is_valid(&planes, &Point3::new(0.0, 1.0, 0.0)).unwrap());
    }

    #[test]
    fn test_union_and_constants() {
        let planes = unit_box();
        let tree = parse("-1 : 2").unwrap();
        assert!(tree.is_valid(&planes, &Point3::new(0.0, 5.0, 0.0)).unwrap());
        assert!(!tree.is_valid(&planes, &Point3::origin()).unwrap());
        assert!(Tree::new().is_valid(&planes, &Point3::origin()).unwrap());
        assert!(!Tree::constant(false).is_valid(&planes, &Point3::origin()).unwrap());
    }

    #[test]
    fn test_unknown_surface() {
        let planes = unit_box();
        let tree = parse("1 -99").unwrap();
        assert_eq!(tree.is_valid(&planes, &Point3::origin()), Err(LookupError::Surface(99)));
    }

    #[test]
    fn test_short_circuit_skips_unknown_surface() {
        let planes = unit_box();
        let tree = parse("-1 -99").unwrap();
        assert_eq!(tree.is_valid(&planes, &Point3::origin()), Ok(false));
    }

    #[test]
    fn test_forced_values() {
        let planes = unit_box();
        let tree = parse("1 -2").unwrap();
        let on_face = Point3::new(0.0, 1.0, 0.0);
        let mut forced = BTreeMap::new();
        forced.insert(2, true);
        assert!(!tree.is_valid_with(&planes, &on_face, &forced).unwrap());
        forced.insert(2, false);
        assert!(tree.is_valid_with(&planes, &on_face, &forced).unwrap());
    }

    #[test]
    fn test_excluded_surfaces() {
        let planes = unit_box();
        let tree = parse("1 -2").unwrap();
        let outside = Point3::new(0.0, 3.0, 0.0);
        assert!(!tree.is_valid(&planes, &outside).unwrap());
        let excluded = BTreeSet::from([2]);
        assert!(tree.is_valid_excluding(&planes, &outside, &excluded).unwrap());
    }

    #[test]
    fn test_direction_and_pair_valid() {
        let planes = unit_box();
        let tree = parse("1 -2 3 -4").unwrap();
        let on_face = Point3::new(0.0, 1.0, 0.0);
        assert!(!tree.is_direction_valid(&planes, &on_face, SurfId::new(2)).unwrap());
        assert!(tree.is_direction_valid(&planes, &on_face, SurfId::new(-2)).unwrap());
        assert_eq!(tree.pair_valid(&planes, &on_face, 2), Ok((false, true)));
        // Surface 6 does not appear in the rule: forcing it changes nothing.
        assert_eq!(tree.pair_valid(&planes, &on_face, 6), Ok((true, true)));
        // Numbers past i32::MAX name no surface.
        let big = i32::MAX as u32 + 1;
        assert_eq!(tree.pair_valid(&planes, &on_face, big), Err(LookupError::Surface(big)));
        assert_eq!(tree.pair_valid(&planes, &on_face, 0), Err(LookupError::Surface(0)));
    }

    #[test]
    fn test_evaluate_short_circuits() {
        let node = parse("(1 2 : 3) (4 : 5 6)").unwrap().root().unwrap().clone();
        let mut seen = Vec::new();
        let value: Result<bool, ()> = evaluate(&node, &mut |leaf: &Node| {
            let Node::Leaf(s) = leaf else { return Err(()) };
            seen.push(s.get());
            Ok(matches!(s.get(), 2 | 3 | 4))
        });
        // 1 fails so 2 is skipped, 3 holds, 4 holds so 5 and 6 are skipped.
        assert_eq!(value, Ok(true));
        assert_eq!(seen, vec![1, 3, 4]);

        let mut calls = 0;
        let value: Result<bool, ()> = evaluate(&node, &mut |_: &Node| {
            calls += 1;
            Ok(false)
        });
        assert_eq!(value, Ok(false));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_region_references() {
        let mut planes = unit_box();
        planes.insert(7, Plane::px(0.0));
        planes.insert_region(10, parse("1 -2 3 -4 5 -6").unwrap());

        let inside_ten = parse("%10 7").unwrap();
        let outside_ten = parse("#10").unwrap();
        let p = Point3::new(0.5, 0.0, 0.0);
        let q = Point3::new(0.5, 4.0, 0.0);
        assert!(inside_ten.is_valid(&planes, &p).unwrap());
        assert!(!inside_ten.is_valid(&planes, &q).unwrap());
        assert!(!outside_ten.is_valid(&planes, &p).unwrap());
        assert!(outside_ten.is_valid(&planes, &q).unwrap());

        let missing = parse("#11").unwrap();
        assert_eq!(missing.is_valid(&planes, &p), Err(LookupError::Region(11)));
    }

    #[test]
    fn test_region_cycle_is_bounded() {
        let mut planes = unit_box();
        planes.insert_region(1, Tree::from_node(Node::container(1)));
        let tree = parse("%1").unwrap();
        assert!(matches!(
            tree.is_valid(&planes, &Point3::origin()),
            Err(LookupError::RegionNesting { region: 1, .. })
        ));
    }

    #[test]
    fn test_dyn_geometry() {
        let planes = unit_box();
        let geometry: &dyn Geometry = &planes;
        let tree = parse("1 -2").unwrap();
        assert!(tree.is_valid(geometry, &Point3::origin()).unwrap());
    }
}
