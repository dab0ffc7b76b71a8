//! Rule nodes: signed leaves and binary boolean combinators.
//!
//! A [`Node`] owns its children through `Box`, so a rule is a plain tree and
//! dropping the root tears down the whole expression. Every traversal matches
//! all five kinds exhaustively.

use crate::types::{Atom, RegionId, SurfId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// Half-space of a signed surface.
    Leaf(SurfId),
    /// Outside of a named region (`#N`).
    Complement(RegionId),
    /// Inside of a named region (`%N`).
    Container(RegionId),
    Intersection(Box<Node>, Box<Node>),
    Union(Box<Node>, Box<Node>),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Kind {
    Leaf,
    Complement,
    Container,
    Intersection,
    Union,
}

impl Kind {
    pub fn is_binary(self) -> bool {
        matches!(self, Kind::Intersection | Kind::Union)
    }
}

// Constructors
impl Node {
    /// Leaf on the signed surface `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is zero or `i32::MIN`.
    pub fn surface(id: i32) -> Self {
        Node::Leaf(SurfId::new(id))
    }

    pub fn complement(region: RegionId) -> Self {
        Node::Complement(region)
    }

    pub fn container(region: RegionId) -> Self {
        Node::Container(region)
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Node::Intersection(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Node::Union(Box::new(lhs), Box::new(rhs))
    }

    /// Builds a binary node of the given kind.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is a leaf kind.
    pub(crate) fn binary(kind: Kind, lhs: Self, rhs: Self) -> Self {
        match kind {
            Kind::Intersection => Node::and(lhs, rhs),
            Kind::Union => Node::or(lhs, rhs),
            _ => panic!("{:?} is not a binary kind", kind),
        }
    }

    /// Conjunction of all `nodes` as a balanced tree, keeping their order.
    /// Returns `None` for an empty input.
    pub fn and_all(nodes: impl IntoIterator<Item = Node>) -> Option<Self> {
        Node::balanced(Kind::Intersection, nodes)
    }

    /// Disjunction of all `nodes` as a balanced tree, keeping their order.
    /// Returns `None` for an empty input.
    pub fn or_all(nodes: impl IntoIterator<Item = Node>) -> Option<Self> {
        Node::balanced(Kind::Union, nodes)
    }

    /// Pairs up neighbours level by level, so `n` operands end up at depth
    /// `ceil(log2(n))`.
    fn balanced(kind: Kind, nodes: impl IntoIterator<Item = Node>) -> Option<Self> {
        let mut level: Vec<Node> = nodes.into_iter().collect();
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut operands = level.into_iter();
            while let Some(lhs) = operands.next() {
                next.push(match operands.next() {
                    Some(rhs) => Node::binary(kind, lhs, rhs),
                    None => lhs,
                });
            }
            level = next;
        }
        level.pop()
    }
}

// Getters
impl Node {
    pub fn kind(&self) -> Kind {
        match self {
            Node::Leaf(_) => Kind::Leaf,
            Node::Complement(_) => Kind::Complement,
            Node::Container(_) => Kind::Container,
            Node::Intersection(_, _) => Kind::Intersection,
            Node::Union(_, _) => Kind::Union,
        }
    }

    pub fn is_leaf(&self) -> bool {
        !self.kind().is_binary()
    }

    pub fn children(&self) -> Option<(&Node, &Node)> {
        match self {
            Node::Intersection(l, r) | Node::Union(l, r) => Some((l, r)),
            Node::Leaf(_) | Node::Complement(_) | Node::Container(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<(&mut Node, &mut Node)> {
        match self {
            Node::Intersection(l, r) | Node::Union(l, r) => Some((l, r)),
            Node::Leaf(_) | Node::Complement(_) | Node::Container(_) => None,
        }
    }

    /// The truth-table variable of a leaf and the polarity under which the
    /// leaf holds. `None` for binary nodes.
    pub fn literal(&self) -> Option<(Atom, bool)> {
        match self {
            Node::Leaf(s) => Some((Atom::Surface(s.surface()), s.is_positive())),
            Node::Complement(r) => Some((Atom::Region(*r), false)),
            Node::Container(r) => Some((Atom::Region(*r), true)),
            Node::Intersection(_, _) | Node::Union(_, _) => None,
        }
    }

    /// Returns `true` if both nodes are leaves over the same variable with
    /// opposite polarity (`3` / `-3`, `#5` / `%5`).
    pub fn is_opposite_leaf(&self, other: &Node) -> bool {
        match (self.literal(), other.literal()) {
            (Some((a, pa)), Some((b, pb))) => a == b && pa != pb,
            _ => false,
        }
    }

    /// Number of nodes in the subtree.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            if let Some((l, r)) = node.children() {
                stack.push(r);
                stack.push(l);
            }
        }
        count
    }

    /// Depth of the subtree (0 for a leaf).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some((l, r)) = node.children() {
                stack.push((r, depth + 1));
                stack.push((l, depth + 1));
            }
        }
        deepest
    }

    /// All leaves in pre-order (left before right).
    pub fn leaves(&self) -> Vec<&Node> {
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node.children() {
                Some((l, r)) => {
                    stack.push(r);
                    stack.push(l);
                }
                None => result.push(node),
            }
        }
        result
    }

    /// All leaves in pre-order, mutably.
    pub fn leaves_mut(&mut self) -> Vec<&mut Node> {
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                result.push(node);
            } else if let Some((l, r)) = node.children_mut() {
                stack.push(r);
                stack.push(l);
            }
        }
        result
    }
}

// Transformations
impl Node {
    /// Logical negation by push-down: signs flip, `#N` and `%N` swap, and
    /// intersections and unions swap (De Morgan).
    pub fn negated(self) -> Node {
        match self {
            Node::Leaf(s) => Node::Leaf(-s),
            Node::Complement(r) => Node::Container(r),
            Node::Container(r) => Node::Complement(r),
            Node::Intersection(l, r) => Node::or(l.negated(), r.negated()),
            Node::Union(l, r) => Node::and(l.negated(), r.negated()),
        }
    }

    /// Replaces `self` by `f(self)` in place.
    pub(crate) fn replace_with<F>(&mut self, f: F)
    where
        F: FnOnce(Node) -> Node,
    {
        let owned = std::mem::replace(self, Node::Complement(0));
        *self = f(owned);
    }

    /// The subtree with `atom` fixed to `value`, folded into a constant where
    /// possible.
    pub fn restrict(&self, atom: Atom, value: bool) -> Folded {
        match self {
            Node::Leaf(_) | Node::Complement(_) | Node::Container(_) => match self.literal() {
                Some((a, polarity)) if a == atom => Folded::Const(polarity == value),
                _ => Folded::Node(self.clone()),
            },
            Node::Intersection(l, r) => Folded::and(l.restrict(atom, value), r.restrict(atom, value)),
            Node::Union(l, r) => Folded::or(l.restrict(atom, value), r.restrict(atom, value)),
        }
    }
}

/// A subtree after constant folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Folded {
    Const(bool),
    Node(Node),
}

impl Folded {
    pub fn and(lhs: Folded, rhs: Folded) -> Folded {
        match (lhs, rhs) {
            (Folded::Const(false), _) | (_, Folded::Const(false)) => Folded::Const(false),
            (Folded::Const(true), x) | (x, Folded::Const(true)) => x,
            (Folded::Node(a), Folded::Node(b)) => Folded::Node(Node::and(a, b)),
        }
    }

    pub fn or(lhs: Folded, rhs: Folded) -> Folded {
        match (lhs, rhs) {
            (Folded::Const(true), _) | (_, Folded::Const(true)) => Folded::Const(true),
            (Folded::Const(false), x) | (x, Folded::Const(false)) => x,
            (Folded::Node(a), Folded::Node(b)) => Folded::Node(Node::or(a, b)),
        }
    }

    pub fn binary(kind: Kind, lhs: Folded, rhs: Folded) -> Folded {
        match kind {
            Kind::Union => Folded::or(lhs, rhs),
            _ => Folded::and(lhs, rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        // 3 -4 (1 : #7)
        Node::and(
            Node::and(Node::surface(3), Node::surface(-4)),
            Node::or(Node::surface(1), Node::complement(7)),
        )
    }

    #[test]
    fn test_kind_and_children() {
        let n = sample();
        assert_eq!(n.kind(), Kind::Intersection);
        let (l, r) = n.children().unwrap();
        assert_eq!(l.kind(), Kind::Intersection);
        assert_eq!(r.kind(), Kind::Union);
        assert!(Node::container(2).is_leaf());
        assert!(Node::surface(2).children().is_none());
    }

    #[test]
    fn test_size_depth_leaves() {
        let n = sample();
        assert_eq!(n.size(), 7);
        assert_eq!(n.depth(), 2);
        let leaves: Vec<_> = n.leaves().into_iter().cloned().collect();
        assert_eq!(
            leaves,
            vec![Node::surface(3), Node::surface(-4), Node::surface(1), Node::complement(7)]
        );
    }

    #[test]
    fn test_negated() {
        let n = sample().negated();
        let expected = Node::or(
            Node::or(Node::surface(-3), Node::surface(4)),
            Node::and(Node::surface(-1), Node::container(7)),
        );
        assert_eq!(n, expected);
        assert_eq!(n.negated(), sample());
    }

    #[test]
    fn test_opposite_leaf() {
        assert!(Node::surface(3).is_opposite_leaf(&Node::surface(-3)));
        assert!(Node::complement(5).is_opposite_leaf(&Node::container(5)));
        assert!(!Node::complement(5).is_opposite_leaf(&Node::complement(5)));
        assert!(!Node::surface(5).is_opposite_leaf(&Node::container(5)));
    }

    #[test]
    fn test_restrict() {
        let n = sample();
        assert_eq!(n.restrict(Atom::Surface(3), false), Folded::Const(false));
        let expected = Node::and(Node::surface(3), Node::surface(-4));
        assert_eq!(n.restrict(Atom::Surface(1), true), Folded::Node(expected));
        let tautology = Node::or(Node::surface(3), Node::surface(-3));
        assert_eq!(tautology.restrict(Atom::Surface(3), true), Folded::Const(true));
        assert_eq!(tautology.restrict(Atom::Surface(3), false), Folded::Const(true));
    }

    #[test]
    fn test_and_all_balanced() {
        assert_eq!(Node::and_all(Vec::new()), None);
        assert_eq!(Node::or_all([Node::surface(1)]), Some(Node::surface(1)));
        assert_eq!(
            Node::and_all([1, 2, 3].map(Node::surface)),
            Some(Node::and(Node::and(Node::surface(1), Node::surface(2)), Node::surface(3)))
        );

        let wide = Node::and_all((1..=1024).map(Node::surface)).unwrap();
        assert_eq!(wide.depth(), 10);
        assert_eq!(wide.size(), 2047);
        let order: Vec<_> = wide.leaves().into_iter().cloned().collect();
        assert_eq!(order, (1..=1024).map(Node::surface).collect::<Vec<_>>());
    }

    #[test]
    fn test_leaves_mut() {
        let mut n = sample();
        for leaf in n.leaves_mut() {
            if let Node::Leaf(s) = leaf {
                *s = -*s;
            }
        }
        assert_eq!(n.leaves()[0], &Node::surface(-3));
    }
}
