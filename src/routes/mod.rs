/// Router Module Index
///
/// Routes are grouped by the access tier the gate assigns to their paths. The
/// grouping is documentation as much as structure: the gate itself decides by
/// path, and admin handlers re-check the caller's role.

/// Reachable without a session: login, password reset, health.
pub mod public;

/// Requires a session with a recognised role.
pub mod authenticated;

/// Requires a session with the ADMIN role.
pub mod admin;
