/// Integration tests for tables and the table store covering combiners,
/// age-off, versioning, deletes, write constraints, persistence and
/// concurrent access.

mod age_off;
mod combiners;
mod concurrency;
mod helpers;
mod persistence;
mod write_path;
