//! Truth-table reasoning over the atoms of a rule.
//!
//! Here a rule is treated as a pure boolean function: every surface and every
//! referenced region is one variable, independent of any geometry. This is
//! what redundancy elimination and equivalence checks work with.

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;

use log::warn;
use num_bigint::BigUint;

use crate::error::{LookupError, Result, StructureError};
use crate::eval::evaluate;
use crate::node::{Folded, Kind, Node};
use crate::simplify::SimplifyConfig;
use crate::tree::{Body, Tree};
use crate::types::Atom;

fn node_atoms(node: &Node) -> BTreeSet<Atom> {
    node.leaves().into_iter().filter_map(|leaf| leaf.literal()).map(|(atom, _)| atom).collect()
}

/// Evaluates `node` with atom `i` of `index` set to bit `i` of `bits`.
/// Atoms missing from `index` are false.
pub(crate) fn eval_bits(node: &Node, index: &BTreeMap<Atom, usize>, bits: u64) -> bool {
    let result: Result<bool, Infallible> = evaluate(node, &mut |leaf: &Node| {
        Ok(match leaf.literal() {
            Some((atom, polarity)) => {
                let value = index.get(&atom).is_some_and(|&i| (bits >> i) & 1 == 1);
                value == polarity
            }
            None => false,
        })
    });
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

pub(crate) fn body_bits(body: &Body, index: &BTreeMap<Atom, usize>, bits: u64) -> bool {
    match body {
        Body::Empty => true,
        Body::Constant(value) => *value,
        Body::Rule(node) => eval_bits(node, index, bits),
    }
}

pub(crate) fn check_limit(count: usize, config: &SimplifyConfig) -> Result<(), StructureError> {
    if count > config.eliminate_max_atoms || count >= 64 {
        warn!("exhaustive check refused: {} atoms", count);
        return Err(StructureError::TooManyAtoms {
            count,
            limit: config.eliminate_max_atoms,
        });
    }
    Ok(())
}

impl Tree {
    /// Distinct atoms of the rule, sorted (surfaces before regions).
    pub fn atoms(&self) -> Vec<Atom> {
        self.root().map(node_atoms).unwrap_or_default().into_iter().collect()
    }

    /// Evaluates the rule under a truth assignment of its atoms.
    pub fn eval_assignment(&self, assignment: &BTreeMap<Atom, bool>) -> Result<bool, LookupError> {
        let node = match self.body() {
            Body::Empty => return Ok(true),
            Body::Constant(value) => return Ok(*value),
            Body::Rule(node) => node,
        };
        evaluate(node, &mut |leaf: &Node| match leaf.literal() {
            Some((atom, polarity)) => match assignment.get(&atom) {
                Some(&value) => Ok(value == polarity),
                None => Err(match atom {
                    Atom::Surface(s) => LookupError::Surface(s),
                    Atom::Region(r) => LookupError::Region(r),
                }),
            },
            None => Ok(false),
        })
    }

    /// The rule's value for every assignment of `atoms`; entry `k` holds the
    /// value with atom `i` set to bit `i` of `k`.
    pub fn truth_table(&self, atoms: &[Atom], config: &SimplifyConfig) -> Result<Vec<bool>> {
        check_limit(atoms.len(), config)?;
        if let Some(missing) = self.atoms().into_iter().find(|a| !atoms.contains(a)) {
            return Err(StructureError::LeafNotFound(missing.to_string()).into());
        }
        let index: BTreeMap<Atom, usize> = atoms.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        Ok((0..1u64 << atoms.len()).map(|bits| body_bits(self.body(), &index, bits)).collect())
    }

    /// Whether both rules agree under every assignment of their atoms.
    pub fn is_equivalent(&self, other: &Tree, config: &SimplifyConfig) -> Result<bool> {
        let atoms: BTreeSet<Atom> = self.atoms().into_iter().chain(other.atoms()).collect();
        let atoms: Vec<Atom> = atoms.into_iter().collect();
        Ok(self.truth_table(&atoms, config)? == other.truth_table(&atoms, config)?)
    }

    /// Number of assignments of the rule's atoms that satisfy it.
    ///
    /// Subtrees over disjoint atoms are combined with product rules; shared
    /// atoms are split by Shannon expansion. Large rules whose parts share
    /// few atoms stay cheap.
    pub fn model_count(&self) -> BigUint {
        match self.body() {
            Body::Empty | Body::Constant(true) => BigUint::from(1u32),
            Body::Constant(false) => BigUint::ZERO,
            Body::Rule(node) => count(node).0,
        }
    }
}

fn pow2(n: usize) -> BigUint {
    BigUint::from(1u32) << n
}

/// Satisfying assignments of `node` over its own atoms.
fn count(node: &Node) -> (BigUint, BTreeSet<Atom>) {
    let (kind, l, r) = match node {
        Node::Intersection(l, r) => (Kind::Intersection, l, r),
        Node::Union(l, r) => (Kind::Union, l, r),
        Node::Leaf(_) | Node::Complement(_) | Node::Container(_) => {
            return (BigUint::from(1u32), node_atoms(node));
        }
    };

    let (cl, al) = count(l);
    let (cr, ar) = count(r);
    if let Some(&shared) = al.intersection(&ar).next() {
        let atoms: BTreeSet<Atom> = al.union(&ar).copied().collect();
        let rest = atoms.len() - 1;
        let total = count_folded(node.restrict(shared, true), rest) + count_folded(node.restrict(shared, false), rest);
        return (total, atoms);
    }

    let (nl, nr) = (al.len(), ar.len());
    let total = match kind {
        Kind::Union => pow2(nl + nr) - (pow2(nl) - &cl) * (pow2(nr) - &cr),
        _ => cl * cr,
    };
    let atoms = al.into_iter().chain(ar).collect();
    (total, atoms)
}

/// Satisfying assignments of a folded subtree over `width` atoms, which
/// include all of its own.
fn count_folded(folded: Folded, width: usize) -> BigUint {
    match folded {
        Folded::Const(true) => pow2(width),
        Folded::Const(false) => BigUint::ZERO,
        Folded::Node(node) => {
            let (c, atoms) = count(&node);
            c * pow2(width - atoms.len())
        }
    }
}
