//! Type-safe wrappers for surface and region identifiers.
//!
//! A rule leaf refers either to a signed surface (a half-space test) or to
//! another named region. These newtypes keep the two id spaces apart and
//! enforce the nonzero-surface invariant at construction.
use std::fmt;
use std::ops::Neg;

/// A signed surface identifier.
///
/// The absolute value names the surface, the sign selects the half-space:
/// positive for the side the surface normal points into, negative for the
/// other one.
///
/// # Invariants
///
/// - The raw value is never zero.
/// - The raw value is never `i32::MIN`, so every id has a negation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SurfId(i32);

impl SurfId {
    /// Creates a signed surface id.
    ///
    /// # Panics
    ///
    /// Panics if `value` is zero or `i32::MIN`. Use [`SurfId::try_new`] for
    /// untrusted input.
    pub fn new(value: i32) -> Self {
        assert_ne!(value, 0, "Surface ids must be nonzero");
        assert_ne!(value, i32::MIN, "Surface id {} has no negation", value);
        SurfId(value)
    }

    /// Creates a signed surface id, or `None` for zero and `i32::MIN`.
    pub fn try_new(value: i32) -> Option<Self> {
        if value == 0 || value == i32::MIN {
            None
        } else {
            Some(SurfId(value))
        }
    }

    /// The positive side of surface number `surface`, or `None` if the
    /// number is zero or does not fit an `i32`.
    pub fn from_surface(surface: u32) -> Option<Self> {
        i32::try_from(surface).ok().and_then(SurfId::try_new)
    }

    /// Returns the raw signed value.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Returns the unsigned surface number.
    pub const fn surface(self) -> u32 {
        self.0.unsigned_abs()
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        SurfId(-self.0)
    }

    /// Returns `true` if `other` names the same surface with the opposite sign.
    pub const fn is_opposite(self, other: SurfId) -> bool {
        self.0 == -other.0
    }

    /// Returns the sign as `+1` or `-1`.
    pub const fn signum(self) -> i32 {
        self.0.signum()
    }
}

impl Neg for SurfId {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl fmt::Display for SurfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SurfId> for i32 {
    fn from(id: SurfId) -> Self {
        id.0
    }
}

/// Identifier of a named composite region, referenced by `#N` and `%N` leaves.
pub type RegionId = u32;

/// A boolean variable of a rule, used for truth-table reasoning.
///
/// Every surface is one variable (true on its positive side), and every
/// referenced region is one variable (true inside the region).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Atom {
    Surface(u32),
    Region(RegionId),
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Surface(s) => write!(f, "s{}", s),
            Atom::Region(r) => write!(f, "r{}", r),
        }
    }
}
