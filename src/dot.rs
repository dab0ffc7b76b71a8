//! Rule to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **Operator nodes** show `∩` or `∪`, grouped by depth
//! - **Leaves** show their text (`3`, `-4`, `#12`, `%3`) at the bottom (sink rank)
//! - **Edges**: solid lines to left children, dashed lines to right children
//! - The **root marker** is a rectangle at the top (source rank)
//!
//! # Examples
//!
//! ```
//! use csg_rule::parse;
//!
//! let tree = parse("3 -4 (1 : 2)").unwrap();
//! let dot = tree.to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! assert!(dot.starts_with("graph {"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::node::{Kind, Node};
use crate::tree::{Body, Tree};

/// Configuration options for DOT output generation.
///
/// ```
/// use csg_rule::dot::DotConfig;
///
/// let config = DotConfig {
///     leaf_shape: "ellipse",
///     ..DotConfig::default()
/// };
/// # let _ = config;
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for operator nodes (default: "circle")
    pub operator_shape: &'static str,
    /// Shape for leaves (default: "box")
    pub leaf_shape: &'static str,
    /// Shape for the root marker (default: "rect")
    pub root_shape: &'static str,
    /// Style for edges to left children (default: "solid")
    pub left_edge_style: &'static str,
    /// Style for edges to right children (default: "dashed")
    pub right_edge_style: &'static str,
    /// Whether to use set symbols (`∩`, `∪`) instead of the rule syntax
    /// (`and`, `:`) for operators (default: true)
    pub use_symbols: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            operator_shape: "circle",
            leaf_shape: "box",
            root_shape: "rect",
            left_edge_style: "solid",
            right_edge_style: "dashed",
            use_symbols: true,
        }
    }
}

impl Tree {
    /// Converts the rule to DOT (Graphviz) format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the rule to DOT format with custom configuration.
    ///
    /// Nodes are named `n<index>` by pre-order index, matching
    /// [`Tree::display_address`].
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape={}];", config.operator_shape)?;

        let root = match self.body() {
            Body::Empty => {
                writeln!(dot, "r [shape={}, label=\"empty\"];", config.root_shape)?;
                writeln!(dot, "}}")?;
                return Ok(dot);
            }
            Body::Constant(value) => {
                writeln!(dot, "r [shape={}, label=\"{}\"];", config.root_shape, value)?;
                writeln!(dot, "}}")?;
                return Ok(dot);
            }
            Body::Rule(node) => node,
        };

        // (index, depth, node), pre-order
        let mut nodes = Vec::new();
        let mut stack: Vec<(&Node, usize)> = vec![(root, 0)];
        while let Some((node, depth)) = stack.pop() {
            nodes.push((nodes.len(), depth, node));
            if let Some((l, r)) = node.children() {
                stack.push((r, depth + 1));
                stack.push((l, depth + 1));
            }
        }

        // Leaves
        writeln!(dot, "{{ rank=sink")?;
        for &(index, _, node) in nodes.iter().filter(|(_, _, n)| n.is_leaf()) {
            writeln!(dot, "n{} [shape={}, label=\"{}\"];", index, config.leaf_shape, node)?;
        }
        writeln!(dot, "}}")?;

        // Operators grouped by depth
        let mut levels = BTreeMap::<usize, Vec<(usize, Kind)>>::new();
        for &(index, depth, node) in nodes.iter().filter(|(_, _, n)| !n.is_leaf()) {
            levels.entry(depth).or_default().push((index, node.kind()));
        }
        for level in levels.values() {
            writeln!(dot, "{{ rank=same")?;
            for &(index, kind) in level {
                let label = match (kind, config.use_symbols) {
                    (Kind::Union, true) => "∪",
                    (Kind::Union, false) => ":",
                    (_, true) => "∩",
                    (_, false) => "and",
                };
                writeln!(dot, "n{} [label=\"{}\"];", index, label)?;
            }
            writeln!(dot, "}}")?;
        }

        // Edges
        for &(index, _, node) in &nodes {
            if let Some((l, _)) = node.children() {
                let right = index + 1 + l.size();
                writeln!(dot, "n{} -- n{} [style={}];", index, index + 1, config.left_edge_style)?;
                writeln!(dot, "n{} -- n{} [style={}];", index, right, config.right_edge_style)?;
            }
        }

        writeln!(dot, "{{ rank=source")?;
        writeln!(dot, "r [shape={}, label=\"{}\"];", config.root_shape, self)?;
        writeln!(dot, "}}")?;
        writeln!(dot, "r -- n0;")?;

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::parser::parse;

    #[test]
    fn test_to_dot_basic() {
        let tree = parse("3 -4 (1 : 2)").unwrap();
        let dot = tree.to_dot().unwrap();

        assert!(dot.starts_with("graph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("n0 [label=\"∩\"];"), "{}", dot);
        assert!(dot.contains("n1 -- n2 [style=solid];"), "{}", dot);
        assert!(dot.contains("label=\"-4\""), "{}", dot);
        assert!(dot.contains("r -- n0;"));
    }

    #[test]
    fn test_to_dot_constants() {
        let dot = Tree::constant(true).to_dot().unwrap();
        assert!(dot.contains("label=\"true\""));
        let dot = Tree::new().to_dot().unwrap();
        assert!(dot.contains("label=\"empty\""));
    }

    #[test]
    fn test_to_dot_with_config() {
        let tree = parse("1 : #2").unwrap();
        let config = DotConfig {
            use_symbols: false,
            right_edge_style: "dotted",
            ..DotConfig::default()
        };
        let dot = tree.to_dot_with_config(&config).unwrap();
        assert!(dot.contains("n0 [label=\":\"];"), "{}", dot);
        assert!(dot.contains("n0 -- n2 [style=dotted];"), "{}", dot);
        assert!(dot.contains("label=\"#2\""), "{}", dot);
    }
}
