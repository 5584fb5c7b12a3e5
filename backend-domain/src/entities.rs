// Domain entities

pub mod model;
pub mod scan_event;

pub use model::*;
pub use scan_event::*;
