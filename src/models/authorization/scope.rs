//! Enum for scopes available in ACLs

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Resource with any id
    All,

    /// Resource belonging to a lot the current user supervises,
    /// or for users, the current user's own record.
    Owned,
}
