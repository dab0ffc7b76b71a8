//! Parser for the cell-definition boolean grammar.
//!
//! # Grammar
//!
//! ```text
//! 3 -4        intersection (adjacency) of the half-spaces +3 and -4
//! 1 : 2       union
//! ( ... )     grouping
//! #12         outside of region 12
//! %12         inside of region 12
//! #( ... )    complement of a group
//! %( ... )    a group, marked as a region body
//! ```
//!
//! Intersection binds tighter than union.
//!
//! # Algorithm
//!
//! The text is tokenized with every (possibly `#`/`%`-prefixed) integer
//! already turned into a placeholder holding its leaf. The innermost
//! parenthesized group is then resolved repeatedly: adjacent placeholders are
//! intersected left to right, the resulting terms are united, and the whole
//! group (including a `#`/`%` right before its `(`) is replaced by a single
//! new placeholder. Once no parentheses remain a final combine runs over the
//! whole token list, which must leave exactly one placeholder.

use std::str::FromStr;

use log::debug;

use crate::error::{ParseError, ParseErrorKind};
use crate::node::Node;
use crate::tree::Tree;
use crate::types::SurfId;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Colon,
    Hash,
    Percent,
    Item(Node),
}

#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    token: Token,
    start: usize,
    end: usize,
}

struct Parser<'a> {
    text: &'a str,
}

/// Parses a rule expression into a [`Tree`].
///
/// # Examples
///
/// ```
/// use csg_rule::parser::parse;
///
/// let tree = parse("3 -4 5 -6 (-1:2:-3:4:-5:6)").unwrap();
/// assert_eq!(tree.surface_ids().len(), 6);
///
/// assert!(parse("3 (4").is_err());
/// assert!(parse("3 : : 4").is_err());
/// ```
pub fn parse(text: &str) -> Result<Tree, ParseError> {
    Parser { text }.run()
}

impl FromStr for Tree {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl<'a> Parser<'a> {
    fn error(&self, kind: ParseErrorKind, start: usize, end: usize) -> ParseError {
        let end = end.min(self.text.len());
        let fragment = self.text.get(start..end).unwrap_or_default();
        ParseError::new(kind, start, fragment)
    }

    fn run(&self) -> Result<Tree, ParseError> {
        let mut tokens = self.tokenize()?;
        if tokens.is_empty() {
            return Err(self.error(ParseErrorKind::Empty, 0, self.text.len()));
        }

        while let Some(close) = tokens.iter().position(|t| t.token == Token::Close) {
            let open = tokens[..close]
                .iter()
                .rposition(|t| t.token == Token::Open)
                .ok_or_else(|| self.error(ParseErrorKind::UnbalancedClose, tokens[close].start, tokens[close].end))?;
            let (group_start, group_end) = (tokens[open].start, tokens[close].end);
            if close == open + 1 {
                return Err(self.error(ParseErrorKind::EmptyGroup, group_start, group_end));
            }

            let inner: Vec<Spanned> = tokens.drain(open + 1..close).collect();
            let node = self.combine(inner, group_start, group_end)?;

            // `(` now sits at `open` and `)` at `open + 1`.
            let (first, node) = match open.checked_sub(1).map(|i| &tokens[i].token) {
                Some(Token::Hash) => (open - 1, node.negated()),
                Some(Token::Percent) => (open - 1, node),
                _ => (open, node),
            };
            let start = tokens[first].start;
            debug!("parse: group '{}' -> {}", &self.text[start..group_end], node);
            tokens.splice(
                first..open + 2,
                [Spanned {
                    token: Token::Item(node),
                    start,
                    end: group_end,
                }],
            );
        }

        if let Some(open) = tokens.iter().find(|t| t.token == Token::Open) {
            return Err(self.error(ParseErrorKind::UnbalancedOpen, open.start, self.text.len()));
        }

        let node = self.combine(tokens, 0, self.text.len())?;
        Ok(Tree::from_node(node))
    }

    fn tokenize(&self) -> Result<Vec<Spanned>, ParseError> {
        let bytes = self.text.as_bytes();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];
            let start = i;
            let simple = match c {
                b'(' => Some(Token::Open),
                b')' => Some(Token::Close),
                b':' => Some(Token::Colon),
                _ => None,
            };
            if let Some(token) = simple {
                tokens.push(Spanned { token, start, end: i + 1 });
                i += 1;
                continue;
            }

            match c {
                c if c.is_ascii_whitespace() => {
                    i += 1;
                }
                b'#' | b'%' => {
                    let next = bytes.get(i + 1).copied();
                    if next == Some(b'(') {
                        let token = if c == b'#' { Token::Hash } else { Token::Percent };
                        tokens.push(Spanned { token, start, end: i + 1 });
                        i += 1;
                    } else if next.is_some_and(|n| n.is_ascii_digit()) {
                        let end = scan_digits(bytes, i + 1);
                        let region: u32 = self.text[i + 1..end]
                            .parse()
                            .map_err(|_| self.error(ParseErrorKind::InvalidNumber, start, end))?;
                        let node = if c == b'#' {
                            Node::complement(region)
                        } else {
                            Node::container(region)
                        };
                        tokens.push(Spanned {
                            token: Token::Item(node),
                            start,
                            end,
                        });
                        i = end;
                    } else {
                        return Err(self.error(ParseErrorKind::DanglingModifier, start, i + 1));
                    }
                }
                b'-' | b'+' | b'0'..=b'9' => {
                    let digits = if c.is_ascii_digit() { i } else { i + 1 };
                    let end = scan_digits(bytes, digits);
                    if end == digits {
                        return Err(self.error(ParseErrorKind::InvalidNumber, start, end.max(i + 1)));
                    }
                    let value: i32 = self.text[start..end]
                        .parse()
                        .map_err(|_| self.error(ParseErrorKind::InvalidNumber, start, end))?;
                    let id = SurfId::try_new(value).ok_or_else(|| {
                        let kind = if value == 0 {
                            ParseErrorKind::ZeroSurface
                        } else {
                            ParseErrorKind::InvalidNumber
                        };
                        self.error(kind, start, end)
                    })?;
                    tokens.push(Spanned {
                        token: Token::Item(Node::Leaf(id)),
                        start,
                        end,
                    });
                    i = end;
                }
                _ => {
                    let ch = self.text[i..].chars().next().unwrap_or('?');
                    return Err(self.error(ParseErrorKind::UnexpectedChar(ch), start, i + ch.len_utf8()));
                }
            }
        }

        Ok(tokens)
    }

    /// Combines a parenthesis-free token run: intersections first, then
    /// unions. Both are built as balanced trees so that long runs stay
    /// shallow.
    fn combine(&self, tokens: Vec<Spanned>, start: usize, end: usize) -> Result<Node, ParseError> {
        let mut terms: Vec<Node> = Vec::new();
        let mut factors: Vec<Node> = Vec::new();
        let mut last_colon: Option<usize> = None;

        for spanned in tokens {
            match spanned.token {
                Token::Item(node) => factors.push(node),
                Token::Colon => {
                    let term = Node::and_all(std::mem::take(&mut factors))
                        .ok_or_else(|| self.error(ParseErrorKind::DanglingOperator, spanned.start, end))?;
                    terms.push(term);
                    last_colon = Some(spanned.start);
                }
                Token::Hash | Token::Percent => {
                    return Err(self.error(ParseErrorKind::DanglingModifier, spanned.start, spanned.end));
                }
                Token::Open => {
                    return Err(self.error(ParseErrorKind::UnbalancedOpen, spanned.start, end));
                }
                Token::Close => {
                    return Err(self.error(ParseErrorKind::UnbalancedClose, spanned.start, spanned.end));
                }
            }
        }

        match Node::and_all(factors) {
            Some(term) => terms.push(term),
            None => {
                return Err(match last_colon {
                    Some(colon) => self.error(ParseErrorKind::DanglingOperator, colon, end),
                    None => self.error(ParseErrorKind::Empty, start, end),
                })
            }
        }

        let count = terms.len();
        Node::or_all(terms).ok_or_else(|| self.error(ParseErrorKind::PlaceholderCount(count), start, end))
    }
}

fn scan_digits(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}
