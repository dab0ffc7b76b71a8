//! Read-only queries and identifier rewrites on a rule.

use std::collections::BTreeSet;

use log::debug;

use crate::error::{Result, StructureError};
use crate::geometry::ExpressionNegator;
use crate::node::{Kind, Node};
use crate::parser::parse;
use crate::tree::{Body, Tree};
use crate::types::{RegionId, SurfId};

impl Tree {
    fn leaves(&self) -> Vec<&Node> {
        self.root().map(Node::leaves).unwrap_or_default()
    }

    /// Distinct surface numbers referenced by the rule, sorted.
    pub fn surface_ids(&self) -> BTreeSet<u32> {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| match leaf {
                Node::Leaf(s) => Some(s.surface()),
                _ => None,
            })
            .collect()
    }

    /// Distinct signed surfaces referenced by the rule, sorted.
    pub fn signed_surface_ids(&self) -> BTreeSet<SurfId> {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| match leaf {
                Node::Leaf(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    /// Distinct regions referenced by `#N` or `%N` leaves, sorted.
    pub fn region_ids(&self) -> BTreeSet<RegionId> {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| match leaf {
                Node::Complement(r) | Node::Container(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    /// Signed surfaces that are direct members of the top-level
    /// intersection, i.e. reachable from the root through intersections only.
    ///
    /// For a rule like `1 -2 (3 : 4)` these are `1` and `-2`: each of them
    /// bounds the whole region on its own.
    pub fn top_surfaces(&self) -> BTreeSet<SurfId> {
        let mut result = BTreeSet::new();
        let mut stack: Vec<&Node> = self.root().into_iter().collect();
        while let Some(node) = stack.pop() {
            match node {
                Node::Intersection(l, r) => {
                    stack.push(r);
                    stack.push(l);
                }
                Node::Leaf(s) => {
                    result.insert(*s);
                }
                Node::Complement(_) | Node::Container(_) | Node::Union(_, _) => {}
            }
        }
        result
    }

    pub fn has_surface(&self, surface: u32) -> bool {
        self.leaves()
            .into_iter()
            .any(|leaf| matches!(leaf, Node::Leaf(s) if s.surface() == surface))
    }

    /// Whether the root is a union.
    pub fn is_union(&self) -> bool {
        self.root().is_some_and(|n| n.kind() == Kind::Union)
    }

    pub fn depth(&self) -> usize {
        self.root().map_or(0, Node::depth)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Replaces every leaf on surface `old` by one on `new`, and returns the
    /// number of replaced leaves.
    ///
    /// A leaf's sign is multiplied by the sign of `new`, so a negative `new`
    /// also flips the half-space. Rebinding the surface definition itself is
    /// the caller's registry update.
    pub fn substitute_surf(&mut self, old: u32, new: SurfId) -> usize {
        let mut count = 0;
        if let Some(root) = self.root_mut() {
            for leaf in root.leaves_mut() {
                if let Node::Leaf(s) = leaf {
                    if s.surface() == old {
                        *s = if s.is_positive() { new } else { -new };
                        count += 1;
                    }
                }
            }
        }
        debug!("substitute: {} -> {} in {} leaves", old, new, count);
        count
    }

    /// Replaces the rule by its logical complement.
    ///
    /// A single leaf just flips; anything larger is serialized, handed to
    /// `negator`, and parsed back. A constant tree has no textual form and
    /// flips its value without consulting `negator`.
    pub fn make_complement<N>(&mut self, negator: &N) -> Result<()>
    where
        N: ExpressionNegator + ?Sized,
    {
        let body = match self.body() {
            Body::Empty => return Err(StructureError::EmptyTree.into()),
            Body::Constant(value) => Body::Constant(!value),
            Body::Rule(node) if node.is_leaf() => Body::Rule(node.clone().negated()),
            Body::Rule(_) => {
                let text = self.display();
                let negated = negator.negate(&text)?;
                debug!("complement: '{}' -> '{}'", text, negated);
                parse(&negated)?.take_body()
            }
        };
        self.set_body(body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::{Error, LookupError};
    use crate::geometry::DeMorganNegator;

    fn ids(values: &[i32]) -> BTreeSet<SurfId> {
        values.iter().copied().map(SurfId::new).collect()
    }

    #[test]
    fn test_surface_ids() {
        let t = parse("3 -4 #9 (-3 : 1 %2)").unwrap();
        assert_eq!(t.surface_ids(), BTreeSet::from([1, 3, 4]));
        assert_eq!(t.signed_surface_ids(), ids(&[-4, -3, 1, 3]));
        assert_eq!(t.region_ids(), BTreeSet::from([2, 9]));
        assert!(t.has_surface(4));
        assert!(!t.has_surface(9));
        assert_eq!(t.leaf_count(), 6);
    }

    #[test]
    fn test_top_surfaces() {
        let t = parse("1 -2 (3 : 4) #5").unwrap();
        assert_eq!(t.top_surfaces(), ids(&[-2, 1]));
        let t = parse("1 : 2").unwrap();
        assert!(t.top_surfaces().is_empty());
        assert!(t.is_union());
        assert_eq!(t.depth(), 1);
    }

    #[test]
    fn test_substitute_surf() {
        let mut t = parse("3 -4 (-3 : 5)").unwrap();
        assert_eq!(t.substitute_surf(3, SurfId::new(30)), 2);
        assert_eq!(t.display(), "30 -4 (-30 : 5)");
        assert_eq!(t.substitute_surf(4, SurfId::new(-40)), 1);
        assert_eq!(t.display(), "30 40 (-30 : 5)");
        assert_eq!(t.substitute_surf(99, SurfId::new(1)), 0);
        assert!(!t.surface_ids().contains(&3));
        assert!(t.surface_ids().contains(&30));

        assert_eq!(t.substitute_surf(30, SurfId::new(-i32::MAX)), 2);
        assert_eq!(t.display(), "-2147483647 40 (2147483647 : 5)");
    }

    #[test]
    fn test_make_complement() {
        let mut t = parse("3 -4").unwrap();
        t.make_complement(&DeMorganNegator).unwrap();
        assert_eq!(t.display(), "(-3 : 4)");

        let mut leaf = parse("#7").unwrap();
        leaf.make_complement(&DeMorganNegator).unwrap();
        assert_eq!(leaf.display(), "%7");

        let mut c = Tree::constant(true);
        c.make_complement(&DeMorganNegator).unwrap();
        assert_eq!(c.as_constant(), Some(false));

        let mut empty = Tree::new();
        assert_eq!(
            empty.make_complement(&DeMorganNegator),
            Err(Error::Structure(StructureError::EmptyTree))
        );
    }

    #[test]
    fn test_make_complement_negator_failure() {
        struct Broken;
        impl ExpressionNegator for Broken {
            fn negate(&self, _text: &str) -> std::result::Result<String, LookupError> {
                Ok("3 (".to_string())
            }
        }
        let mut t = parse("3 -4").unwrap();
        assert!(matches!(t.make_complement(&Broken), Err(Error::Parse(_))));
    }
}
