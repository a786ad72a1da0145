//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Two entities are the same entity when their ids are equal, whatever the
/// rest of their state says.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Eq + core::hash::Hash + core::fmt::Debug + ?Sized;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    fn same_entity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
