//! Stable identifiers for loaded symbols and binding model entries.

use std::fmt;

#[cfg(feature = "interchange")]
use serde::{Deserialize, Serialize};

/// Index of a [`RealSymbol`](super::RealSymbol) inside its
/// [`SymbolTable`](super::SymbolTable).
///
/// Assigned sequentially in load order, so two tables loaded from the same
/// inputs agree on every id.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct SymbolId(pub u32);

impl SymbolId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

impl From<u32> for SymbolId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Position of an entry in the [`BindingModel`](super::BindingModel).
///
/// Used for cross references between entries (a method returning a bound
/// type points at that type's entry).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct EntryId(pub u32);

impl EntryId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_small() {
        assert_eq!(std::mem::size_of::<SymbolId>(), 4);
        assert_eq!(std::mem::size_of::<Option<EntryId>>(), 8);
    }

    #[test]
    fn test_index_round_trip() {
        assert_eq!(SymbolId::new(7).index(), 7);
        assert_eq!(SymbolId::from(3), SymbolId(3));
        assert_eq!(format!("{:?}", EntryId::new(2)), "EntryId(2)");
    }
}
