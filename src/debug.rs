//! Debug utilities for inspecting rule structure.
//!
//! These are primarily useful in tests and during development.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::StructureError;
use crate::node::{Kind, Node};
use crate::simplify::SimplifyConfig;
use crate::tree::{Body, Tree};
use crate::truth::{body_bits, check_limit};
use crate::types::Atom;

/// Detailed information about a single node of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Pre-order index of the node
    pub index: usize,
    /// Index of the parent (None for the root)
    pub parent: Option<usize>,
    pub kind: Kind,
    /// Number of nodes in the subtree rooted here
    pub size: usize,
    /// The leaf text (`3`, `-4`, `#12`), or `None` for operators
    pub label: Option<String>,
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.index)?;
        match self.parent {
            Some(parent) => write!(f, "^{} ", parent)?,
            None => write!(f, "^- ")?,
        }
        match &self.label {
            Some(label) => write!(f, "{:?} {}", self.kind, label),
            None => write!(f, "{:?} (size={})", self.kind, self.size),
        }
    }
}

/// Every node of a rule in pre-order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTable {
    pub nodes: Vec<NodeInfo>,
}

impl fmt::Display for NodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for info in &self.nodes {
            let depth = self.depth_of(info);
            writeln!(f, "{:indent$}{}", "", info, indent = 2 * depth)?;
        }
        Ok(())
    }
}

impl NodeTable {
    fn depth_of(&self, info: &NodeInfo) -> usize {
        let mut depth = 0;
        let mut current = info.parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes.get(parent).and_then(|p| p.parent);
        }
        depth
    }
}

impl Tree {
    /// Pre-order listing of every node with its parent index.
    pub fn node_table(&self) -> NodeTable {
        let mut nodes = Vec::new();
        let mut stack: Vec<(&Node, Option<usize>)> = self.root().map(|n| (n, None)).into_iter().collect();

        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            nodes.push(NodeInfo {
                index,
                parent,
                kind: node.kind(),
                size: node.size(),
                label: node.is_leaf().then(|| node.to_string()),
            });
            if let Some((l, r)) = node.children() {
                stack.push((r, Some(index)));
                stack.push((l, Some(index)));
            }
        }

        NodeTable { nodes }
    }

    /// Information about the node at pre-order `index`.
    pub fn node_info(&self, index: usize) -> Option<NodeInfo> {
        self.node_table().nodes.into_iter().nth(index)
    }

    /// Multi-line dump of the rule with node addresses, one node per line,
    /// indented by depth.
    ///
    /// Format: `[index] ^parent Kind label`
    pub fn display_address(&self) -> String {
        match self.body() {
            Body::Empty => "<empty>\n".to_string(),
            Body::Constant(value) => format!("<{}>\n", value),
            Body::Rule(_) => self.node_table().to_string(),
        }
    }

    /// Checks the rule against `expected` under every assignment of `atoms`.
    ///
    /// Returns the failing assignments as `(assignment, expected, actual)`.
    /// Atoms of the rule missing from `atoms` are treated as false. More than
    /// [`SimplifyConfig::eliminate_max_atoms`] atoms are refused with
    /// [`StructureError::TooManyAtoms`].
    pub fn verify_truth_table(
        &self,
        atoms: &[Atom],
        config: &SimplifyConfig,
        expected: impl Fn(&[bool]) -> bool,
    ) -> Result<Vec<(Vec<bool>, bool, bool)>, StructureError> {
        let n = atoms.len();
        check_limit(n, config)?;

        let mut failures = Vec::new();
        let index: BTreeMap<Atom, usize> = atoms.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        for bits in 0..(1u64 << n) {
            let assignment: Vec<bool> = (0..n).map(|i| (bits >> i) & 1 == 1).collect();
            let actual = body_bits(self.body(), &index, bits);
            let expected = expected(&assignment);
            if actual != expected {
                failures.push((assignment, expected, actual));
            }
        }

        Ok(failures)
    }
}
