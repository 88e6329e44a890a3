use std::fmt::{Display, Formatter};
use std::ops::Neg;

use crate::utils::MyHash;

/// Handle to a BDD node with a complement bit.
///
/// The sign carries the complement flag: `-r` is the negation of the function
/// referenced by `r`. Index `1` is the terminal, so `+1` is true and `-1` is false.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(i32);

impl Ref {
    pub const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn is_negated(self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// Return the internal (signed) representation of the reference.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Return the index of the referenced node in the storage.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Reconstruct a reference from its signed representation.
    pub(crate) const fn from_raw(value: i32) -> Self {
        Self(value)
    }

    pub(crate) fn unsigned(self) -> u32 {
        (self.0.unsigned_abs() << 1) + self.is_negated() as u32
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        self.unsigned() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        let r = Ref::positive(5);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!(-(-r), r);
        assert_eq!((-r).index(), 5);
    }

    #[test]
    fn test_display() {
        let r = Ref::positive(3);
        assert_eq!(r.to_string(), "@3");
        assert_eq!((-r).to_string(), "~@3");
    }

    #[test]
    fn test_unsigned_distinguishes_sign() {
        let r = Ref::positive(7);
        assert_ne!(r.unsigned(), (-r).unsigned());
        assert_eq!(r.unsigned(), 14);
        assert_eq!((-r).unsigned(), 15);
    }
}
