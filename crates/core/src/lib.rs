//! Pure domain logic for the feedback collection service.
//!
//! Apart from reading environment variables in [`settings`], nothing in
//! this crate performs I/O; the database, HTTP adapters and server crates
//! build on these types and rules.

pub mod domain_match;
pub mod error;
pub mod error_log;
pub mod github_repo;
pub mod ingest;
pub mod pagination;
pub mod roles;
pub mod settings;
pub mod storage_key;
pub mod timestamps;
pub mod types;
