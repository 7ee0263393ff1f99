use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EoError, EoResult};

/// Geographic bounding box in coordinate order (min_x, min_y, max_x, max_y).
///
/// Axis interpretation follows the coordinate reference system of the
/// request or dataset it belongs to; no axis flipping is performed here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build from a `[min_x, min_y, max_x, max_y]` sequence, as found in
    /// request payloads and job configuration.
    pub fn from_slice(values: &[f64]) -> EoResult<Self> {
        if values.len() != 4 {
            return Err(EoError::config(format!(
                "bounding box needs 4 values, got {}",
                values.len()
            )));
        }
        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn validate(&self) -> EoResult<()> {
        if self.min_x >= self.max_x || self.min_y >= self.max_y {
            return Err(EoError::config(format!(
                "degenerate bounding box: {}",
                self
            )));
        }
        Ok(())
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let bbox = BoundingBox::from_slice(&[-6.21, 53.23, -6.14, 53.27]).unwrap();
        assert_eq!(bbox.min_x, -6.21);
        assert_eq!(bbox.max_y, 53.27);
        assert!((bbox.width() - 0.07).abs() < 1e-9);
    }

    #[test]
    fn test_from_slice_wrong_len() {
        assert!(BoundingBox::from_slice(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_validate_degenerate() {
        let bbox = BoundingBox::new(10.0, 5.0, 10.0, 6.0);
        assert!(bbox.validate().is_err());
    }

    #[test]
    fn test_display() {
        let bbox = BoundingBox::new(-6.21, 53.23, -6.14, 53.27);
        assert_eq!(bbox.to_string(), "-6.21,53.23,-6.14,53.27");
    }
}
