use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EoError;

/// Coordinate reference system identified by EPSG code.
///
/// Products arrive in a mix of geographic (EPSG:4326) and projected
/// (UTM zones, web mercator) systems, so this is a plain code rather
/// than an enumeration of known systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(u32);

impl Crs {
    /// WGS 84 geographic coordinates
    pub const WGS84: Crs = Crs(4326);

    /// Web mercator
    pub const WEB_MERCATOR: Crs = Crs(3857);

    pub fn from_epsg(code: u32) -> Self {
        Self(code)
    }

    pub fn epsg(&self) -> u32 {
        self.0
    }

    /// Geographic systems carry degree coordinates, projected ones metres.
    pub fn is_geographic(&self) -> bool {
        matches!(self.0, 4326 | 4258 | 4269)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = EoError;

    /// Accepts `EPSG:4326` (case insensitive) or a bare numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s
            .trim()
            .strip_prefix("EPSG:")
            .or_else(|| s.trim().strip_prefix("epsg:"))
            .unwrap_or_else(|| s.trim());
        code.parse::<u32>()
            .map(Crs)
            .map_err(|_| EoError::config(format!("Unsupported CRS: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::WGS84);
        assert_eq!("epsg:32629".parse::<Crs>().unwrap(), Crs::from_epsg(32629));
        assert_eq!("3857".parse::<Crs>().unwrap(), Crs::WEB_MERCATOR);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("EPSG:abc".parse::<Crs>().is_err());
        assert!("urn:ogc".parse::<Crs>().is_err());
    }

    #[test]
    fn test_is_geographic() {
        assert!(Crs::WGS84.is_geographic());
        assert!(!Crs::WEB_MERCATOR.is_geographic());
        assert!(!Crs::from_epsg(32629).is_geographic());
    }

    #[test]
    fn test_display() {
        assert_eq!(Crs::from_epsg(32629).to_string(), "EPSG:32629");
    }
}
