pub mod sqlite_event_repository;

pub use sqlite_event_repository::*;
