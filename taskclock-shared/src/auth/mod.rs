/// Authentication
///
/// Identity comes from bearer JWTs issued elsewhere. This module validates
/// them and resolves the caller against the store.
///
/// # Modules
///
/// - [`jwt`]: HS256 claims, signing and validation
/// - [`middleware`]: header parsing and the per-request [`middleware::AuthContext`]

pub mod jwt;
pub mod middleware;
