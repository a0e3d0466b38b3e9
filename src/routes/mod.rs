/// Router Module Index
///
/// Routing is split by access level so authentication is applied once, as a layer,
/// rather than per handler.

/// Routes reachable without a token.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Routes nested under `/admin`, admin role checked in the handlers.
pub mod admin;
