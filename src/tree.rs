//! The rule tree: ownership, composition and structural edits.
//!
//! A [`Tree`] exclusively owns its [`Node`]s. Parent links are derived data:
//! [`Tree::make_parents`] computes them from the current structure, every
//! mutation discards them, and operations that navigate upward rebuild them
//! first. They are addressed by pre-order index (the root is `0`, a left
//! child is its parent's index plus one).

use std::ops::{BitAnd, BitOr, Deref};
use std::sync::Arc;

use log::debug;

use crate::error::StructureError;
use crate::node::{Folded, Kind, Node};

/// The content of a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No rule yet. Valid everywhere, but structural edits refuse it.
    #[default]
    Empty,
    /// The rule folded to a constant truth value.
    Constant(bool),
    Rule(Node),
}

impl From<Folded> for Body {
    fn from(folded: Folded) -> Self {
        match folded {
            Folded::Const(value) => Body::Constant(value),
            Folded::Node(node) => Body::Rule(node),
        }
    }
}

impl Body {
    fn into_folded(self) -> Option<Folded> {
        match self {
            Body::Empty => None,
            Body::Constant(value) => Some(Folded::Const(value)),
            Body::Rule(node) => Some(Folded::Node(node)),
        }
    }
}

#[derive(Debug, Default)]
pub struct Tree {
    body: Body,
    parents: Option<Vec<Option<usize>>>,
}

impl Clone for Tree {
    /// Deep copy of the rule. Parent links are not copied.
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            parents: None,
        }
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

impl Eq for Tree {}

impl From<Node> for Tree {
    fn from(node: Node) -> Self {
        Tree::from_node(node)
    }
}

impl From<Body> for Tree {
    fn from(body: Body) -> Self {
        Self { body, parents: None }
    }
}

// Constructors
impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_node(node: Node) -> Self {
        Body::Rule(node).into()
    }

    pub fn constant(value: bool) -> Self {
        Body::Constant(value).into()
    }

    /// Conjunction of two trees. An empty operand is the identity.
    pub fn intersect(a: Tree, b: Tree) -> Tree {
        Self::combine(Kind::Intersection, a, b)
    }

    /// Disjunction of two trees. An empty operand is the identity.
    pub fn union_of(a: Tree, b: Tree) -> Tree {
        Self::combine(Kind::Union, a, b)
    }

    fn combine(kind: Kind, a: Tree, b: Tree) -> Tree {
        match (a.body.into_folded(), b.body.into_folded()) {
            (None, None) => Tree::new(),
            (Some(x), None) | (None, Some(x)) => Body::from(x).into(),
            (Some(x), Some(y)) => Body::from(Folded::binary(kind, x, y)).into(),
        }
    }

    /// Logical negation by push-down through the tree.
    pub fn complement_of(&self) -> Result<Tree, StructureError> {
        match &self.body {
            Body::Empty => Err(StructureError::EmptyTree),
            Body::Constant(value) => Ok(Tree::constant(!value)),
            Body::Rule(node) => Ok(Tree::from_node(node.clone().negated())),
        }
    }
}

// Getters
impl Tree {
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn root(&self) -> Option<&Node> {
        match &self.body {
            Body::Rule(node) => Some(node),
            Body::Empty | Body::Constant(_) => None,
        }
    }

    /// Mutable access to the root node. Discards the parent links.
    pub fn root_mut(&mut self) -> Option<&mut Node> {
        self.parents = None;
        match &mut self.body {
            Body::Rule(node) => Some(node),
            Body::Empty | Body::Constant(_) => None,
        }
    }

    /// The root node, or [`StructureError::EmptyTree`] if there is none.
    pub fn try_root(&self) -> Result<&Node, StructureError> {
        self.root().ok_or(StructureError::EmptyTree)
    }

    pub fn is_empty(&self) -> bool {
        self.body == Body::Empty
    }

    /// The constant truth value if the rule folded to one.
    pub fn as_constant(&self) -> Option<bool> {
        match self.body {
            Body::Constant(value) => Some(value),
            Body::Empty | Body::Rule(_) => None,
        }
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.root().map_or(0, Node::size)
    }

    /// Node at pre-order `index`.
    pub fn node(&self, index: usize) -> Option<&Node> {
        let mut stack: Vec<&Node> = self.root().into_iter().collect();
        let mut counter = 0;
        while let Some(node) = stack.pop() {
            if counter == index {
                return Some(node);
            }
            counter += 1;
            if let Some((l, r)) = node.children() {
                stack.push(r);
                stack.push(l);
            }
        }
        None
    }
}

// Mutation
impl Tree {
    pub fn set_root(&mut self, node: Node) {
        self.set_body(Body::Rule(node));
    }

    pub(crate) fn set_body(&mut self, body: Body) {
        self.body = body;
        self.parents = None;
    }

    pub fn take_body(&mut self) -> Body {
        self.parents = None;
        std::mem::take(&mut self.body)
    }

    /// Drops the rule, leaving an empty tree.
    pub fn reset(&mut self) {
        self.set_body(Body::Empty);
    }

    /// Adds `other` as an extra conjunct.
    ///
    /// The new intersection node is spliced in at the bottom of the
    /// intersection spine, so repeated calls grow one flat conjunction. At
    /// each intersection on the way down the children are swapped and the
    /// walk continues on the new left side, which keeps the conjunction
    /// balanced: `n` additions leave it about `log2(n)` deep. Operand order is
    /// not preserved. If this tree is empty, it becomes a copy of `other`.
    pub fn add_intersection(&mut self, other: &Tree) {
        self.add(Kind::Intersection, other);
    }

    /// Adds `other` as an extra disjunct, in the same manner as
    /// [`Tree::add_intersection`].
    pub fn add_union(&mut self, other: &Tree) {
        self.add(Kind::Union, other);
    }

    fn add(&mut self, kind: Kind, other: &Tree) {
        let body = match (self.take_body(), &other.body) {
            (body, Body::Empty) => body,
            (Body::Empty, body) => body.clone(),
            (Body::Rule(mut node), Body::Rule(extra)) => {
                splice(&mut node, kind, extra.clone());
                Body::Rule(node)
            }
            (body, extra) => match (body.into_folded(), extra.clone().into_folded()) {
                (Some(x), Some(y)) => Folded::binary(kind, x, y).into(),
                _ => Body::Empty,
            },
        };
        self.set_body(body);
    }

    /// Removes the first leaf equal to `leaf` in pre-order, promoting its
    /// sibling into the place of their parent. Removing the sole root leaf
    /// empties the tree.
    pub fn remove_leaf(&mut self, leaf: &Node) -> Result<(), StructureError> {
        if !leaf.is_leaf() {
            return Err(StructureError::NotALeaf);
        }
        self.remove_first(|node| node == leaf, || format!("{:?}", leaf))
    }

    /// Removes the first leaf on `surface`, of either sign.
    pub fn remove_item(&mut self, surface: u32) -> Result<(), StructureError> {
        self.remove_first(
            |node| matches!(node, Node::Leaf(s) if s.surface() == surface),
            || surface.to_string(),
        )
    }

    fn remove_first<P, D>(&mut self, pred: P, describe: D) -> Result<(), StructureError>
    where
        P: Fn(&Node) -> bool,
        D: FnOnce() -> String,
    {
        self.parents = None;
        let node = match &mut self.body {
            Body::Rule(node) => node,
            Body::Empty | Body::Constant(_) => return Err(StructureError::EmptyTree),
        };
        match remove_in(node, &pred) {
            Removal::NotFound => Err(StructureError::LeafNotFound(describe())),
            Removal::Matched => {
                debug!("remove: root leaf removed, tree is now empty");
                self.body = Body::Empty;
                Ok(())
            }
            Removal::Removed => Ok(()),
        }
    }
}

fn splice(mut node: &mut Node, kind: Kind, extra: Node) {
    loop {
        let same = node.kind() == kind;
        if same && matches!(node, Node::Intersection(..) | Node::Union(..)) {
            match { node } {
                Node::Intersection(l, r) | Node::Union(l, r) => {
                    std::mem::swap(l, r);
                    node = &mut **l;
                }
                _ => unreachable!(),
            }
        } else {
            node.replace_with(|old| Node::binary(kind, old, extra));
            return;
        }
    }
}

enum Removal {
    NotFound,
    /// The node itself is the match; the caller must splice it out.
    Matched,
    Removed,
}

fn remove_in<P>(node: &mut Node, pred: &P) -> Removal
where
    P: Fn(&Node) -> bool,
{
    match node {
        Node::Intersection(l, r) | Node::Union(l, r) => {
            match remove_in(l, pred) {
                Removal::Matched => {
                    let sibling = std::mem::replace(r.as_mut(), Node::Complement(0));
                    *node = sibling;
                    return Removal::Removed;
                }
                Removal::Removed => return Removal::Removed,
                Removal::NotFound => {}
            }
            match remove_in(r, pred) {
                Removal::Matched => {
                    let sibling = std::mem::replace(l.as_mut(), Node::Complement(0));
                    *node = sibling;
                    Removal::Removed
                }
                other => other,
            }
        }
        Node::Leaf(_) | Node::Complement(_) | Node::Container(_) => {
            if pred(&*node) {
                Removal::Matched
            } else {
                Removal::NotFound
            }
        }
    }
}

// Parent links
impl Tree {
    /// Recomputes the parent link of every node.
    pub fn make_parents(&mut self) {
        self.parents = Some(compute_parents(self.root()));
    }

    /// Verifies that parent links are present and match the structure.
    pub fn check_parents(&self) -> Result<(), StructureError> {
        match &self.parents {
            Some(links) if *links == compute_parents(self.root()) => Ok(()),
            _ => Err(StructureError::StaleParents),
        }
    }

    pub(crate) fn clear_parents(&mut self) {
        self.parents = None;
    }

    pub fn has_parents(&self) -> bool {
        self.parents.is_some()
    }

    /// Parent index of the node at `index` (`None` for the root).
    pub fn parent(&self, index: usize) -> Result<Option<usize>, StructureError> {
        let links = self.parents.as_ref().ok_or(StructureError::StaleParents)?;
        links.get(index).copied().ok_or(StructureError::BadAddress(index))
    }

    /// Mutable access to the node at pre-order `index`, found by walking the
    /// parent links up to the root and then back down.
    ///
    /// Does not discard the links: a caller that changes structure must.
    pub(crate) fn node_at_mut(&mut self, index: usize) -> Result<&mut Node, StructureError> {
        let links = self.parents.as_ref().ok_or(StructureError::StaleParents)?;
        if index >= links.len() {
            return Err(StructureError::BadAddress(index));
        }
        let mut chain = vec![index];
        let mut current = index;
        while let Some(parent) = links[current] {
            chain.push(parent);
            current = parent;
        }

        let mut node = match &mut self.body {
            Body::Rule(node) => node,
            Body::Empty | Body::Constant(_) => return Err(StructureError::EmptyTree),
        };
        for step in chain.windows(2).rev() {
            let (child, parent) = (step[0], step[1]);
            let (l, r) = node.children_mut().ok_or(StructureError::BadAddress(index))?;
            node = if child == parent + 1 { l } else { r };
        }
        Ok(node)
    }
}

fn compute_parents(root: Option<&Node>) -> Vec<Option<usize>> {
    let mut links = Vec::new();
    let mut stack: Vec<(&Node, Option<usize>)> = root.map(|n| (n, None)).into_iter().collect();
    while let Some((node, parent)) = stack.pop() {
        let index = links.len();
        links.push(parent);
        if let Some((l, r)) = node.children() {
            stack.push((r, Some(index)));
            stack.push((l, Some(index)));
        }
    }
    links
}

impl BitAnd for Tree {
    type Output = Tree;

    fn bitand(self, rhs: Self) -> Self::Output {
        Tree::intersect(self, rhs)
    }
}

impl BitOr for Tree {
    type Output = Tree;

    fn bitor(self, rhs: Self) -> Self::Output {
        Tree::union_of(self, rhs)
    }
}

/// A read-only, cheaply cloneable handle to a finished tree.
///
/// Only `&Tree` is reachable through it, so concurrent readers can share a
/// rule without any way to mutate it.
#[derive(Debug, Clone)]
pub struct FrozenTree(Arc<Tree>);

impl Tree {
    pub fn freeze(self) -> FrozenTree {
        FrozenTree(Arc::new(self))
    }
}

impl FrozenTree {
    /// An independent, mutable copy.
    pub fn thaw(&self) -> Tree {
        self.0.as_ref().clone()
    }
}

impl Deref for FrozenTree {
    type Target = Tree;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
