//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and the create DTO used for inserts.

pub mod feedback;
pub mod notification_job;
pub mod screenshot;
pub mod status;
