/// Bearer-token authentication and password hashing
pub mod auth;
/// Mapping of domain errors onto HTTP responses
pub mod error_handling;
/// Per-client request throttling
pub mod rate_limit;
