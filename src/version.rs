// Crate identity reported by GET /version

/// Crate version at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name at build time.
pub const NAME: &str = env!("CARGO_PKG_NAME");
