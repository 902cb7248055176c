//! Repository module for database access
//!
//! Typed repositories for owners, vehicles, documents and reminder logs.

pub mod document;
pub mod reminder_log;
pub mod user;
pub mod vehicle;

pub use document::DocumentRepository;
pub use reminder_log::ReminderLogRepository;
pub use user::UserRepository;
pub use vehicle::VehicleRepository;
