//! JSON metadata sidecar for stored datasets.

use serde_json::{json, Map, Value};

use eo_common::{time, Dataset, EoError, EoResult, ProductMetadata};

/// Build the sidecar document: the product metadata mapping with a
/// `dataset` summary (dimensions, shape, variables, time range) added.
pub fn metadata_document(metadata: &ProductMetadata, dataset: &Dataset) -> EoResult<Value> {
    let mut doc = match metadata.to_document()? {
        Value::Object(map) => map,
        other => {
            return Err(EoError::serialization(format!(
                "Metadata must serialize to an object, got {}",
                other
            )))
        }
    };
    doc.insert("dataset".to_string(), dataset_summary(dataset)?);
    Ok(Value::Object(doc))
}

/// Serialize the sidecar document to JSON text bytes.
pub fn encode(metadata: &ProductMetadata, dataset: &Dataset) -> EoResult<Vec<u8>> {
    let doc = metadata_document(metadata, dataset)?;
    Ok(serde_json::to_vec_pretty(&doc)?)
}

fn dataset_summary(dataset: &Dataset) -> EoResult<Value> {
    let mut summary = Map::new();
    summary.insert(
        "dimensions".to_string(),
        Value::Array(
            dataset
                .dims()
                .iter()
                .map(|d| json!({"name": d.name, "length": d.len}))
                .collect(),
        ),
    );
    summary.insert("shape".to_string(), json!(dataset.shape()));
    summary.insert(
        "variables".to_string(),
        Value::Array(
            dataset
                .variables()
                .iter()
                .map(|v| Value::String(v.name.clone()))
                .collect(),
        ),
    );
    if let Some((start, end)) = dataset.time_range() {
        let start = time::from_epoch_seconds(start)?;
        let end = time::from_epoch_seconds(end)?;
        summary.insert(
            "time_range".to_string(),
            json!({
                "start": time::format_request(&start),
                "end": time::format_request(&end),
            }),
        );
    }
    if !dataset.attrs().is_empty() {
        summary.insert(
            "attributes".to_string(),
            Value::Object(dataset.attrs().clone()),
        );
    }
    Ok(Value::Object(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eo_common::Dimension;
    use serde_json::json;

    fn dataset() -> Dataset {
        let mut ds = Dataset::new(vec![
            Dimension::new("time", 2),
            Dimension::new("y", 3),
            Dimension::new("x", 4),
        ]);
        ds.set_coord("time", vec![1_647_339_630.0, 1_647_426_030.0])
            .unwrap();
        ds.add_variable("ndvi", vec![0.5; 24]).unwrap();
        ds.set_attr("source", json!("sentinel-2"));
        ds
    }

    #[test]
    fn test_document_carries_metadata_and_summary() {
        let metadata = ProductMetadata {
            platform: Some("S2A".into()),
            ..Default::default()
        };
        let doc = metadata_document(&metadata, &dataset()).unwrap();

        assert_eq!(doc["platform"], json!("S2A"));
        assert_eq!(doc["dataset"]["shape"], json!([2, 3, 4]));
        assert_eq!(doc["dataset"]["variables"], json!(["ndvi"]));
        assert_eq!(doc["dataset"]["dimensions"][1]["name"], json!("y"));
        assert_eq!(
            doc["dataset"]["time_range"]["start"],
            json!("2022-03-15T10:20:30Z")
        );
        assert_eq!(doc["dataset"]["attributes"]["source"], json!("sentinel-2"));
    }

    #[test]
    fn test_metadata_round_trips() {
        let mut metadata = ProductMetadata::default();
        metadata.extra.insert("cloudCover".into(), json!(12.5));
        metadata.extra.insert("tags".into(), json!(["eo", "test"]));

        let bytes = encode(&metadata, &dataset()).unwrap();
        let mut parsed: Value = serde_json::from_slice(&bytes).unwrap();
        parsed.as_object_mut().unwrap().remove("dataset");

        let back: ProductMetadata = serde_json::from_value(parsed).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_no_time_coordinate_omits_time_range() {
        let mut ds = Dataset::new(vec![Dimension::new("y", 1), Dimension::new("x", 1)]);
        ds.add_variable("v", vec![1.0]).unwrap();
        let doc = metadata_document(&ProductMetadata::default(), &ds).unwrap();
        assert!(doc["dataset"].get("time_range").is_none());
    }
}
