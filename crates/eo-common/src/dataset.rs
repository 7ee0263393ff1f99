use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::crs::Crs;
use crate::error::{EoError, EoResult};

/// Named dimension with its length, e.g. `("time", 1)` or `("y", 100)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

impl Dimension {
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
        }
    }
}

/// Data variable spanning all dataset dimensions, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub values: Vec<f32>,
}

/// Affine transform mapping pixel space to CRS coordinates.
///
/// `pixel_height` is negative for the usual north-up rasters where the
/// origin is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// North-up transform covering `bbox` with a raster of
    /// `width` x `height` pixels.
    pub fn from_bbox(bbox: &crate::bbox::BoundingBox, width: usize, height: usize) -> Self {
        Self {
            origin_x: bbox.min_x,
            origin_y: bbox.max_y,
            pixel_width: bbox.width() / width as f64,
            pixel_height: -bbox.height() / height as f64,
        }
    }
}

/// Spatial reference of a dataset: CRS plus pixel-to-world transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    pub crs: Crs,
    pub transform: GeoTransform,
}

/// In-memory multidimensional dataset.
///
/// Holds an ordered list of named dimensions, optional 1-D `f64`
/// coordinates per dimension, named `f32` variables spanning all
/// dimensions in row-major order, JSON attributes and an optional
/// spatial reference. This is the unit handed to the exporter.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    dims: Vec<Dimension>,
    coords: HashMap<String, Vec<f64>>,
    variables: Vec<Variable>,
    attrs: Map<String, Value>,
    georef: Option<GeoReference>,
}

impl Dataset {
    pub fn new(dims: Vec<Dimension>) -> Self {
        Self {
            dims,
            ..Default::default()
        }
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn dim(&self, name: &str) -> Option<&Dimension> {
        self.dims.iter().find(|d| d.name == name)
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.len).collect()
    }

    /// Number of elements each variable must hold.
    pub fn element_count(&self) -> usize {
        self.dims.iter().map(|d| d.len).product()
    }

    /// A dataset with no variables or a zero-length dimension holds
    /// nothing worth storing.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() || self.element_count() == 0
    }

    /// Attach a coordinate to an existing dimension.
    pub fn set_coord(&mut self, dim: &str, values: Vec<f64>) -> EoResult<()> {
        let expected = self
            .dim(dim)
            .ok_or_else(|| EoError::encoding(format!("Unknown dimension: {}", dim)))?
            .len;
        if values.len() != expected {
            return Err(EoError::encoding(format!(
                "Coordinate {} has {} values, dimension has {}",
                dim,
                values.len(),
                expected
            )));
        }
        self.coords.insert(dim.to_string(), values);
        Ok(())
    }

    pub fn coord(&self, dim: &str) -> Option<&[f64]> {
        self.coords.get(dim).map(|v| v.as_slice())
    }

    pub fn add_variable(&mut self, name: impl Into<String>, values: Vec<f32>) -> EoResult<()> {
        let name = name.into();
        if values.len() != self.element_count() {
            return Err(EoError::encoding(format!(
                "Variable {} has {} values, dataset shape {:?} needs {}",
                name,
                values.len(),
                self.shape(),
                self.element_count()
            )));
        }
        if self.variables.iter().any(|v| v.name == name) {
            return Err(EoError::encoding(format!("Duplicate variable: {}", name)));
        }
        self.variables.push(Variable { name, values });
        Ok(())
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: Value) {
        self.attrs.insert(key.into(), value);
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    pub fn set_georef(&mut self, georef: GeoReference) {
        self.georef = Some(georef);
    }

    pub fn georef(&self) -> Option<&GeoReference> {
        self.georef.as_ref()
    }

    /// The trailing two dimensions as `(height, width)`.
    pub fn spatial_shape(&self) -> EoResult<(usize, usize)> {
        if self.dims.len() < 2 {
            return Err(EoError::encoding(format!(
                "Raster export needs at least 2 dimensions, dataset has {}",
                self.dims.len()
            )));
        }
        let height = self.dims[self.dims.len() - 2].len;
        let width = self.dims[self.dims.len() - 1].len;
        Ok((height, width))
    }

    /// Product of all dimensions before the spatial pair. One raster
    /// band is written per variable per leading index.
    pub fn leading_count(&self) -> usize {
        if self.dims.len() < 2 {
            return 1;
        }
        self.dims[..self.dims.len() - 2]
            .iter()
            .map(|d| d.len)
            .product()
    }

    pub fn band_count(&self) -> usize {
        self.variables.len() * self.leading_count()
    }

    /// Min and max of the time coordinate, if the dataset has one.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let time = self.coords.get("time")?;
        if time.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in time {
            min = min.min(v);
            max = max.max(v);
        }
        Some((min, max))
    }
}
