//! Object naming for fetched products.
//!
//! The key is derived from the request document itself:
//! `BBOX(<minx>_<miny>_<maxx>_<maxy>)/<module>/<instrument>/<frequency>/
//! <start>-<end>/<fname>`, where `<fname>` is the product file name with
//! `response`/`request` replaced by the mosaicking order. Under testing
//! the whole path sits beneath the test prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use eo_common::{time, EoError, EoResult};
use storage::ProductKey;

use crate::sentinel_hub::ProcessRequest;

/// Output frequency tag of a processing module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    /// Poll interval for scheduled runs.
    pub fn poll_interval(&self) -> Duration {
        match self {
            Frequency::Daily => Duration::from_secs(24 * 3600),
            Frequency::Monthly => Duration::from_secs(30 * 24 * 3600),
            Frequency::Yearly => Duration::from_secs(365 * 24 * 3600),
        }
    }

    /// How far back a request window reaches.
    pub fn lookback(&self) -> chrono::Duration {
        match self {
            Frequency::Daily => chrono::Duration::days(1),
            Frequency::Monthly => chrono::Duration::days(30),
            Frequency::Yearly => chrono::Duration::days(365),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = EoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(EoError::config(format!("Unknown frequency: {}", other))),
        }
    }
}

/// Derive the object key for one product file.
pub fn object_name(
    request: &ProcessRequest,
    module: &str,
    frequency: Frequency,
    file_name: &str,
    testing: bool,
) -> EoResult<String> {
    let input = request.primary_input()?;
    let bbox = request
        .input
        .bounds
        .bbox
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("_");

    let range = &input.data_filter.time_range;
    let start = time::compact_date(&time::parse_timestamp(&range.from)?);
    let end = time::compact_date(&time::parse_timestamp(&range.to)?);

    let mosaicking = input
        .data_filter
        .mosaicking_order
        .as_deref()
        .unwrap_or("nomosaicking");
    let fname = file_name
        .replace("response", mosaicking)
        .replace("request", mosaicking);

    let key = format!(
        "BBOX({})/{}/{}/{}/{}-{}/{}",
        bbox, module, input.data_type, frequency, start, end, fname
    );
    Ok(ProductKey::scoped(&key, testing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel_hub::{
        Bounds, DataFilter, InputData, ProcessInput, ProcessOutput, ResponseSpec, TimeRange,
    };

    fn request(mosaicking: Option<&str>) -> ProcessRequest {
        ProcessRequest {
            input: ProcessInput {
                bounds: Bounds {
                    bbox: [-6.21, 53.23, -6.14, 53.27],
                    properties: None,
                },
                data: vec![InputData {
                    data_type: "S2L2A".to_string(),
                    data_filter: DataFilter {
                        time_range: TimeRange {
                            from: "2022-03-01T00:00:00Z".to_string(),
                            to: "2022-03-15T00:00:00Z".to_string(),
                        },
                        mosaicking_order: mosaicking.map(String::from),
                    },
                }],
            },
            output: ProcessOutput {
                width: 512,
                height: 512,
                responses: vec![ResponseSpec::tiff("default")],
            },
            evalscript: String::new(),
        }
    }

    #[test]
    fn test_object_name_layout() {
        let name = object_name(
            &request(Some("leastCC")),
            "ndvi",
            Frequency::Monthly,
            "response.tiff",
            false,
        )
        .unwrap();
        assert_eq!(
            name,
            "BBOX(-6.21_53.23_-6.14_53.27)/ndvi/S2L2A/monthly/20220301-20220315/leastCC.tiff"
        );
    }

    #[test]
    fn test_request_sidecar_gets_same_directory() {
        let req = request(None);
        let tiff = object_name(&req, "ndvi", Frequency::Daily, "response.tiff", false).unwrap();
        let json = object_name(&req, "ndvi", Frequency::Daily, "request.json", false).unwrap();
        assert_eq!(tiff.rsplit_once('/').unwrap().0, json.rsplit_once('/').unwrap().0);
        assert!(tiff.ends_with("/nomosaicking.tiff"));
        assert!(json.ends_with("/nomosaicking.json"));
    }

    #[test]
    fn test_testing_prefix() {
        let name = object_name(
            &request(Some("mostRecent")),
            "ndvi",
            Frequency::Yearly,
            "response.tiff",
            true,
        )
        .unwrap();
        assert!(name.starts_with("_test/BBOX("));
    }

    #[test]
    fn test_frequency_parse_and_display() {
        assert_eq!("Daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!(Frequency::Monthly.to_string(), "monthly");
        assert!("weekly".parse::<Frequency>().is_err());
    }
}
