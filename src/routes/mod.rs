/// Router Module Index
///
/// Splits the HTTP surface by access class. The access gate wraps all three,
/// so the grouping here mirrors the path prefixes the gate classifies on.

/// Catalogue, availability and the auth pages. Reachable without a session.
pub mod public;

/// `/dashboard` pages. The gate redirects visitors without a session to `/signin`.
pub mod dashboard;

/// `/admin` pages. The gate only lets sessions with the `admin` role through.
pub mod admin;
