use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EoError, EoResult};
use crate::time;

/// Provenance metadata attached to a stored product.
///
/// The named fields mirror the catalogue properties delivered with
/// source products; anything else travels in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_level_directory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,

    #[serde(
        default,
        rename = "processingLevel",
        skip_serializing_if = "Option::is_none"
    )]
    pub processing_level: Option<String>,

    #[serde(
        default,
        rename = "startTimeFromAscendingNode",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(
        default,
        rename = "relativeOrbitNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub relative_orbit_number: Option<i64>,

    #[serde(
        default,
        rename = "platformSerialIdentifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_serial_identifier: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductMetadata {
    /// Hierarchical storage prefix derived from provenance, or `None`
    /// when any of the required fields is absent.
    ///
    /// Layout: `<top>/<platform>/<instrument>/<level>/<year>/<month>/<id>/<yyyymmdd>`.
    pub fn provenance_path(&self) -> EoResult<Option<String>> {
        let (top, platform, instrument, level, start, id) = match (
            &self.top_level_directory,
            &self.platform,
            &self.instrument,
            &self.processing_level,
            &self.start_time,
            &self.id,
        ) {
            (Some(a), Some(b), Some(c), Some(d), Some(e), Some(f)) => (a, b, c, d, e, f),
            _ => return Ok(None),
        };
        let date = time::parse_timestamp(start)?;
        Ok(Some(format!(
            "{}/{}/{}/{}/{}/{}/{}/{}",
            top,
            platform,
            instrument,
            level,
            date.format("%Y"),
            date.format("%m"),
            id,
            time::compact_date(&date)
        )))
    }

    /// Base object key for a dataset produced by `chain`.
    ///
    /// With full provenance the chain name sits under the provenance
    /// prefix; without it the chain name alone is the key.
    pub fn base_key(&self, chain: &str) -> EoResult<String> {
        if chain.is_empty() {
            return Err(EoError::encoding("Chain name must not be empty"));
        }
        match self.provenance_path()? {
            Some(prefix) => Ok(format!("{}/{}", prefix, chain)),
            None => Ok(chain.to_string()),
        }
    }

    /// JSON document for the metadata sidecar.
    pub fn to_document(&self) -> EoResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
