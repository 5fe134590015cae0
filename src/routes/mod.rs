/// Router Module Index
///
/// Routes are split by access level, and access control is applied per router
/// in `create_router`, so a protected endpoint cannot be exposed by accident.

/// Routes accessible to anonymous clients: health, register/login, event browsing.
pub mod public;

/// Routes behind the bearer-token middleware: profile and enrollment.
pub mod authenticated;

/// Event management routes. Behind the bearer-token middleware, with the admin
/// role checked inside each handler.
pub mod admin;
