/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded migration runner
///
/// Table-level SQL lives with the models in [`crate::models`].

pub mod migrations;
pub mod pool;
