//! The per-step observation/reply record a game pushes into its [`crate::hist::Hist`].

/// A game-specific observation/reply record.
///
/// This is the runtime-`has_field` substitute for the source's compile-time
/// field-registration templates: a `State` type that doesn't model the
/// "named role" gating concept at all simply doesn't override `HAS_NAME` or
/// `name()`, and `CondPerGroup::check` then ignores a group's `name` filter
/// unconditionally for that type — exactly mirroring the source's behavior
/// when the compile-time field-existence check comes back negative, but
/// decided at the type level instead of by a runtime string lookup.
pub trait GameState: Default + Send + 'static {
    /// Whether this type carries a symbolic "role" name at all. Types that
    /// leave this `false` (the default) are never filtered by a group's
    /// `GroupStat::name`.
    const HAS_NAME: bool = false;

    /// The record's current role name, if `HAS_NAME` is `true`.
    fn name(&self) -> Option<&str> {
        None
    }
}
