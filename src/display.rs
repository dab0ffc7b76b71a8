//! Serialization of rules back into the cell-definition grammar.
//!
//! Intersection is written as adjacency and binds tighter than `:`, so only a
//! union nested under an intersection needs parentheses. A union at the top
//! level is always parenthesized, so a serialized rule can be pasted next to
//! other terms without changing its meaning.
//!
//! ```
//! use csg_rule::parser::parse;
//!
//! let tree = parse("3 -4 (1:2)").unwrap();
//! assert_eq!(tree.display(), "3 -4 (1 : 2)");
//! assert_eq!(parse("1 2 : 3").unwrap().display(), "(1 2 : 3)");
//! ```

use std::fmt;

use crate::node::{Kind, Node};
use crate::tree::{Body, Tree};

#[derive(Copy, Clone, Eq, PartialEq)]
enum Context {
    Top,
    Inside(Kind),
}

fn write_node(node: &Node, context: Context, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match node {
        Node::Leaf(s) => write!(f, "{}", s),
        Node::Complement(r) => write!(f, "#{}", r),
        Node::Container(r) => write!(f, "%{}", r),
        Node::Intersection(l, r) => {
            write_node(l, Context::Inside(Kind::Intersection), f)?;
            write!(f, " ")?;
            write_node(r, Context::Inside(Kind::Intersection), f)
        }
        Node::Union(l, r) => {
            let wrap = context != Context::Inside(Kind::Union);
            if wrap {
                write!(f, "(")?;
            }
            write_node(l, Context::Inside(Kind::Union), f)?;
            write!(f, " : ")?;
            write_node(r, Context::Inside(Kind::Union), f)?;
            if wrap {
                write!(f, ")")?;
            }
            Ok(())
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(self, Context::Top, f)
    }
}

/// Empty and constant trees have no textual form and print as the empty
/// string.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body() {
            Body::Rule(node) => write!(f, "{}", node),
            Body::Empty | Body::Constant(_) => Ok(()),
        }
    }
}

impl Tree {
    /// The rule in the grammar accepted by [`crate::parser::parse`].
    ///
    /// Empty and constant trees (for instance a rule that
    /// [`Tree::simplify`] folded to `false`) have no textual form and give
    /// `""`, which does not parse back. Use [`Tree::try_display`] when the
    /// text must round-trip.
    pub fn display(&self) -> String {
        self.to_string()
    }

    /// The rule text, or `None` for an empty or constant tree.
    pub fn try_display(&self) -> Option<String> {
        self.root().map(Node::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(id: i32) -> Node {
        Node::surface(id)
    }

    #[test]
    fn test_display_leaves() {
        assert_eq!(s(-4).to_string(), "-4");
        assert_eq!(Node::complement(12).to_string(), "#12");
        assert_eq!(Node::container(3).to_string(), "%3");
    }

    #[test]
    fn test_display_intersection_of_union() {
        let n = Node::and(Node::and(s(3), s(-4)), Node::or(s(1), s(2)));
        assert_eq!(n.to_string(), "3 -4 (1 : 2)");
    }

    #[test]
    fn test_display_top_union() {
        let n = Node::or(Node::and(s(3), s(-5)), Node::and(s(4), s(-5)));
        assert_eq!(n.to_string(), "(3 -5 : 4 -5)");
    }

    #[test]
    fn test_display_nested_unions_flatten() {
        let n = Node::and(s(7), Node::or(Node::or(s(1), s(2)), Node::or(s(3), Node::complement(9))));
        assert_eq!(n.to_string(), "7 (1 : 2 : 3 : #9)");
    }

    #[test]
    fn test_display_right_nested_intersection() {
        let n = Node::and(s(1), Node::and(s(2), s(3)));
        assert_eq!(n.to_string(), "1 2 3");
    }

    #[test]
    fn test_display_constant_tree() {
        assert_eq!(Tree::constant(false).display(), "");
        assert_eq!(Tree::new().display(), "");
        assert_eq!(Tree::constant(true).try_display(), None);
        assert_eq!(Tree::new().try_display(), None);
    }

    #[test]
    fn test_try_display_after_folding() {
        use crate::parser::parse;

        let mut t = parse("1 (3 -3)").unwrap();
        t.simplify().unwrap();
        assert_eq!(t.as_constant(), Some(false));
        assert_eq!(t.try_display(), None);

        let t = parse("1 (3 : -4)").unwrap();
        let text = t.try_display().unwrap();
        assert_eq!(parse(&text).unwrap(), t);
    }
}
