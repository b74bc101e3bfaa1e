// Request and response shapes that exist only at the HTTP boundary.
// Domain entities are serialized as they are.

// Query strings, pagination and counters
pub mod common;

// Token issue and refresh
pub mod auth;
