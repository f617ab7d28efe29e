//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Used for owned sub-objects of an aggregate (comments, attachments) that
/// carry identity but are not streams of their own.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
