// Domain value objects
pub mod coordinates;
pub mod location;
pub mod scan_type;

pub use coordinates::*;
pub use location::*;
pub use scan_type::*;
