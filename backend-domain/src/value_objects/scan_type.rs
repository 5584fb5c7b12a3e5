// Scan direction value object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanType {
    Entry,
    Exit,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Entry => "Entry",
            ScanType::Exit => "Exit",
        }
    }

    /// Direction of the scan that follows `previous` for the same badge.
    ///
    /// A badge with no history, or whose last scan was an exit, is outside;
    /// its next scan is an entry. Anything else is inside and leaves next.
    pub fn following(previous: Option<ScanType>) -> ScanType {
        match previous {
            None | Some(ScanType::Exit) => ScanType::Entry,
            Some(ScanType::Entry) => ScanType::Exit,
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown scan type '{0}'")]
pub struct UnknownScanType(pub String);

impl FromStr for ScanType {
    type Err = UnknownScanType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" => Ok(ScanType::Entry),
            "exit" => Ok(ScanType::Exit),
            _ => Err(UnknownScanType(s.to_string())),
        }
    }
}
