// Location labels stored when no place name could be resolved

pub const LOCATION_UNKNOWN: &str = "Location Unknown";
pub const LOCATION_NOT_FOUND: &str = "Location Not Found";
pub const LOCATION_LOOKUP_FAILED: &str = "Location Lookup Failed";
