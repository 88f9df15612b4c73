//! Entity trait: identity + continuity across state changes.
//!
//! Used for sub-entities embedded in an aggregate (e.g. project phases) that
//! have their own identity but no stream of their own.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Find an entity by id in a slice.
    fn find_by_id<'a>(items: &'a [Self], id: &Self::Id) -> Option<&'a Self>
    where
        Self: Sized,
    {
        items.iter().find(|item| item.id() == id)
    }
}
