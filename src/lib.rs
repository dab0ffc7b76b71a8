//! # csg-rule: boolean surface rules for CSG cells
//!
//! **`csg-rule`** is the expression engine behind constructive-solid-geometry
//! cell definitions. A cell is the set of points satisfying a boolean rule over
//! signed half-spaces: `3` is the positive side of surface 3, `-4` the
//! negative side of surface 4, adjacency is intersection and `:` is union.
//!
//! ## What is a rule?
//!
//! A rule is a binary tree of [`Node`]s. Leaves are signed surfaces or
//! references to other named regions (`#N` for the complement of region `N`,
//! `%N` for region `N` itself); inner nodes are intersections and unions.
//! Surfaces themselves (planes, quadrics) live outside this crate behind the
//! [`Geometry`] trait.
//!
//! ## Basic Usage
//!
//! ```rust
//! use csg_rule::geometry::{Plane, PlaneSet};
//! use csg_rule::parse;
//! use nalgebra::{Point3, Vector3};
//!
//! // 1. Describe the surfaces: a slab between y = -1 and y = 1
//! let planes = PlaneSet::new()
//!     .with(1, Plane::py(-1.0))
//!     .with(2, Plane::py(1.0));
//!
//! // 2. Parse a rule
//! let cell = parse("1 -2").unwrap();
//! assert_eq!(cell.display(), "1 -2");
//!
//! // 3. Point containment
//! assert!(cell.is_valid(&planes, &Point3::origin()).unwrap());
//! assert!(!cell.is_valid(&planes, &Point3::new(0.0, 3.0, 0.0)).unwrap());
//!
//! // 4. Ray tracking: leaving the slab upward crosses +2 after 1.0
//! let hit = cell.track_surf(&planes, &Point3::origin(), &Vector3::y()).unwrap().unwrap();
//! assert_eq!(i32::from(hit.surface), 2);
//! assert!((hit.distance - 1.0).abs() < 1e-9);
//! ```
//!
//! ## Core Components
//!
//! - **[`tree`]**: The [`Tree`] owner with composition and structural edits.
//! - **[`parser`]** / **[`display`]**: The text grammar in both directions.
//! - **[`eval`]** / **[`track`]**: Point containment and ray crossings.
//! - **[`simplify`]**: Complementary-pair removal, distribution and redundancy elimination.
//! - **[`truth`]**: Truth tables, equivalence and model counting.
//! - **[`dot`]**: Utilities for visualizing rules using Graphviz.

pub mod debug;
pub mod display;
pub mod dot;
pub mod error;
pub mod eval;
pub mod geometry;
pub mod node;
pub mod parser;
pub mod query;
pub mod simplify;
pub mod track;
pub mod tree;
pub mod truth;
pub mod types;

pub use crate::error::{Error, LookupError, ParseError, StructureError};
pub use crate::geometry::{ExpressionNegator, Geometry, Side};
pub use crate::node::Node;
pub use crate::parser::parse;
pub use crate::simplify::SimplifyConfig;
pub use crate::track::{Crossing, TrackConfig};
pub use crate::tree::{Body, FrozenTree, Tree};
pub use crate::types::{Atom, RegionId, SurfId};
