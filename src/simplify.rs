//! Structural simplification of rules.
//!
//! The cheap passes ([`Tree::remove_complementary`], [`Tree::make_cnf`]) are
//! local rewrites that run to a fixed point under an iteration cap.
//! Redundancy elimination ([`Tree::eliminate`]) is exhaustive over truth
//! assignments and only runs when asked, below a configured atom count.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::debug;

use crate::error::{Error, Result};
use crate::node::{Folded, Kind, Node};
use crate::truth::{body_bits, check_limit};
use crate::tree::{Body, Tree};
use crate::types::Atom;

/// Limits for the simplification passes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SimplifyConfig {
    /// Rewrite steps a fixed-point pass may take before giving up.
    pub max_iterations: usize,
    /// Largest number of distinct atoms for exhaustive truth-table checks.
    pub eliminate_max_atoms: usize,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            eliminate_max_atoms: 16,
        }
    }
}

/// Operator makeup of a subtree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CommonType {
    /// Only intersections and leaves.
    Intersection,
    /// Only unions and leaves.
    Union,
    Mixed,
}

/// Classifies `node` by the binary operators it contains.
///
/// A lone leaf counts as an intersection.
pub fn common_type(node: &Node) -> CommonType {
    let mut seen: Option<Kind> = None;
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if let Some((l, r)) = node.children() {
            match seen {
                Some(kind) if kind != node.kind() => return CommonType::Mixed,
                _ => seen = Some(node.kind()),
            }
            stack.push(r);
            stack.push(l);
        }
    }
    match seen {
        Some(Kind::Union) => CommonType::Union,
        _ => CommonType::Intersection,
    }
}

/// Atoms that occur with both polarities in `node`.
///
/// `#N` and `%N` count as opposite polarities of region `N`.
pub fn opposite_surfaces(node: &Node) -> BTreeSet<Atom> {
    let mut seen = BTreeSet::new();
    let mut opposite = BTreeSet::new();
    for (atom, polarity) in node.leaves().into_iter().filter_map(Node::literal) {
        if seen.contains(&(atom, !polarity)) {
            opposite.insert(atom);
        }
        seen.insert((atom, polarity));
    }
    opposite
}

/// Outcome of inspecting one binary node for a local simplification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    Unchanged,
    /// Replace the node by this subtree.
    Replace(Node),
    /// The node is a constant.
    Constant(bool),
}

/// Finds the local simplification applicable at `node` itself.
///
/// A pure conjunction holding a variable with both polarities is false and a
/// pure disjunction doing so is true; two equal leaf children reduce to one.
pub fn reduce(node: &Node) -> Reduction {
    let Some((l, r)) = node.children() else {
        return Reduction::Unchanged;
    };
    let union = node.kind() == Kind::Union;

    if l.is_opposite_leaf(r) {
        return Reduction::Constant(union);
    }
    let pure = match common_type(node) {
        CommonType::Intersection => !union,
        CommonType::Union => union,
        CommonType::Mixed => false,
    };
    if pure && !opposite_surfaces(node).is_empty() {
        return Reduction::Constant(union);
    }
    if l.is_leaf() && l == r {
        return Reduction::Replace(l.clone());
    }
    Reduction::Unchanged
}

/// The first reducible node in pre-order, with its index.
fn find_reduction(root: &Node) -> Option<(usize, Reduction)> {
    let mut stack = vec![(root, 0)];
    while let Some((node, index)) = stack.pop() {
        let reduction = reduce(node);
        if reduction != Reduction::Unchanged {
            return Some((index, reduction));
        }
        if let Some((l, r)) = node.children() {
            stack.push((r, index + 1 + l.size()));
            stack.push((l, index + 1));
        }
    }
    None
}

/// Rebuilds `node` (at pre-order `index`) with the subtree at `target`
/// replaced by `value`, folding constants upward.
fn fold_at(node: &Node, index: usize, target: usize, value: bool) -> Folded {
    if index == target {
        return Folded::Const(value);
    }
    if target < index || target >= index + node.size() {
        return Folded::Node(node.clone());
    }
    match node.children() {
        Some((l, r)) => {
            let lhs = fold_at(l, index + 1, target, value);
            let rhs = fold_at(r, index + 1 + l.size(), target, value);
            Folded::binary(node.kind(), lhs, rhs)
        }
        None => Folded::Node(node.clone()),
    }
}

/// The first intersection with a union child in level order, by pre-order
/// index.
fn find_distributable(root: &Node) -> Option<usize> {
    let mut queue = VecDeque::from([(root, 0)]);
    while let Some((node, index)) = queue.pop_front() {
        if let Node::Intersection(l, r) = node {
            if l.kind() == Kind::Union || r.kind() == Kind::Union {
                return Some(index);
            }
        }
        if let Some((l, r)) = node.children() {
            queue.push_back((l, index + 1));
            queue.push_back((r, index + 1 + l.size()));
        }
    }
    None
}

/// One distribution step at an intersection with a union child.
fn distribute(node: Node) -> Node {
    match node {
        Node::Intersection(l, r) => match (*l, *r) {
            (Node::Union(a, b), c) => Node::or(Node::and(*a, c.clone()), Node::and(*b, c)),
            (c, Node::Union(a, b)) => Node::or(Node::and(c.clone(), *a), Node::and(c, *b)),
            (l, r) => Node::and(l, r),
        },
        other => other,
    }
}

struct Budget {
    used: usize,
    limit: usize,
    pass: &'static str,
}

impl Budget {
    fn new(pass: &'static str, limit: usize) -> Self {
        Self { used: 0, limit, pass }
    }

    fn spend(&mut self) -> Result<()> {
        if self.used >= self.limit {
            return Err(Error::NonTermination {
                pass: self.pass,
                limit: self.limit,
            });
        }
        self.used += 1;
        Ok(())
    }
}

/// Distributed form of `node`, built from clones.
fn cnf_rebuilt(node: &Node, budget: &mut Budget) -> Result<Node> {
    match node {
        Node::Intersection(l, r) => {
            let lhs = cnf_rebuilt(l, budget)?;
            let rhs = cnf_rebuilt(r, budget)?;
            distribute_rebuilt(lhs, rhs, budget)
        }
        Node::Union(l, r) => Ok(Node::or(cnf_rebuilt(l, budget)?, cnf_rebuilt(r, budget)?)),
        Node::Leaf(_) | Node::Complement(_) | Node::Container(_) => Ok(node.clone()),
    }
}

/// Intersection of two distributed subtrees, distributed again.
fn distribute_rebuilt(lhs: Node, rhs: Node, budget: &mut Budget) -> Result<Node> {
    match (lhs, rhs) {
        (Node::Union(a, b), c) => {
            budget.spend()?;
            Ok(Node::or(
                distribute_rebuilt(*a, c.clone(), budget)?,
                distribute_rebuilt(*b, c, budget)?,
            ))
        }
        (c, Node::Union(a, b)) => {
            budget.spend()?;
            Ok(Node::or(
                distribute_rebuilt(c.clone(), *a, budget)?,
                distribute_rebuilt(c, *b, budget)?,
            ))
        }
        (l, r) => Ok(Node::and(l, r)),
    }
}

impl Tree {
    /// Operator makeup of the rule, or `None` without a rule.
    pub fn common_type(&self) -> Option<CommonType> {
        self.root().map(common_type)
    }

    /// Atoms of the rule that occur with both polarities.
    pub fn opposite_surfaces(&self) -> BTreeSet<Atom> {
        self.root().map(opposite_surfaces).unwrap_or_default()
    }

    /// Applies [`reduce`] top-down until no node changes, folding constants
    /// into their ancestors. Returns whether anything changed.
    ///
    /// Every step shrinks the rule, so the pass terminates; the iteration
    /// cap only guards against a broken invariant.
    pub fn remove_complementary(&mut self, config: &SimplifyConfig) -> Result<bool> {
        let mut budget = Budget::new("remove_complementary", config.max_iterations);
        loop {
            let Some((index, reduction)) = self.root().and_then(find_reduction) else {
                break;
            };
            budget.spend()?;
            debug!("remove_complementary: node {} -> {:?}", index, reduction);
            match reduction {
                Reduction::Unchanged => break,
                Reduction::Replace(node) => {
                    self.make_parents();
                    *self.node_at_mut(index)? = node;
                    self.clear_parents();
                }
                Reduction::Constant(value) => {
                    let folded = match self.root() {
                        Some(root) => fold_at(root, 0, index, value),
                        None => break,
                    };
                    self.set_body(folded.into());
                }
            }
        }
        Ok(budget.used > 0)
    }

    /// The default simplification: [`Tree::remove_complementary`] only.
    pub fn simplify(&mut self) -> Result<bool> {
        self.simplify_with(&SimplifyConfig::default())
    }

    pub fn simplify_with(&mut self, config: &SimplifyConfig) -> Result<bool> {
        self.remove_complementary(config)
    }

    /// Whether no intersection has a union child.
    pub fn is_cnf(&self) -> bool {
        self.root().map_or(true, |root| find_distributable(root).is_none())
    }

    /// Distributes intersections over unions in place until no intersection
    /// has a union child, and returns the number of rewrites.
    ///
    /// Candidates are found in level order and reached through parent links.
    /// The result can be exponentially larger than the input; the iteration
    /// cap bounds it.
    pub fn make_cnf(&mut self, config: &SimplifyConfig) -> Result<usize> {
        let mut budget = Budget::new("make_cnf", config.max_iterations);
        while let Some(index) = self.root().and_then(find_distributable) {
            budget.spend()?;
            debug!("make_cnf: distributing at node {}", index);
            self.make_parents();
            self.node_at_mut(index)?.replace_with(distribute);
        }
        self.clear_parents();
        debug!("make_cnf: {} rewrites", budget.used);
        Ok(budget.used)
    }

    /// Same result as [`Tree::make_cnf`], computed by rebuilding the rule
    /// from clones without parent links.
    pub fn make_cnf_copy(&mut self, config: &SimplifyConfig) -> Result<usize> {
        let (tree, count) = self.to_cnf(config)?;
        *self = tree;
        Ok(count)
    }

    /// The distributed form as a new tree, leaving `self` untouched, with
    /// the number of rewrites.
    pub fn to_cnf(&self, config: &SimplifyConfig) -> Result<(Tree, usize)> {
        let mut budget = Budget::new("make_cnf_copy", config.max_iterations);
        let body = match self.body() {
            Body::Rule(node) => Body::Rule(cnf_rebuilt(node, &mut budget)?),
            other => other.clone(),
        };
        debug!("make_cnf_copy: {} rewrites", budget.used);
        Ok((Tree::from(body), budget.used))
    }

    /// Atoms whose value never affects the rule.
    ///
    /// Every assignment of the other atoms is checked with the target atom
    /// both false and true, so the cost is exponential in the number of
    /// distinct atoms. Rules above [`SimplifyConfig::eliminate_max_atoms`]
    /// are refused.
    pub fn eliminate(&self, config: &SimplifyConfig) -> Result<Vec<Atom>> {
        let atoms = self.atoms();
        check_limit(atoms.len(), config)?;
        let index: BTreeMap<Atom, usize> = atoms.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        let body = self.body();

        let redundant: Vec<Atom> = atoms
            .iter()
            .enumerate()
            .filter(|&(i, _)| {
                let bit = 1u64 << i;
                (0..1u64 << atoms.len())
                    .filter(|bits| bits & bit == 0)
                    .all(|bits| body_bits(body, &index, bits) == body_bits(body, &index, bits | bit))
            })
            .map(|(_, &atom)| atom)
            .collect();
        debug!("eliminate: {} of {} atoms redundant", redundant.len(), atoms.len());
        Ok(redundant)
    }

    /// Removes the atoms found by [`Tree::eliminate`] by fixing each to
    /// false and folding. Returns the removed atoms.
    pub fn eliminate_redundant(&mut self, config: &SimplifyConfig) -> Result<Vec<Atom>> {
        let redundant = self.eliminate(config)?;
        for &atom in &redundant {
            let body = match self.take_body() {
                Body::Rule(node) => node.restrict(atom, false).into(),
                other => other,
            };
            self.set_body(body);
        }
        Ok(redundant)
    }
}
