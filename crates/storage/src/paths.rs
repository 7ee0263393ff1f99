/// Prefix under which test runs write, so they can be wiped in bulk.
pub const TEST_PREFIX: &str = "_test";

/// Artifact key layout.
///
/// Every artifact of a stored dataset hangs off one base key:
/// the raster at `<base>.tif`, the metadata sidecar at
/// `<base>_metadata.json` and the Zarr store under `<base>.zarr/`.
pub struct ProductKey;

impl ProductKey {
    pub fn geotiff(base: &str) -> String {
        format!("{}.tif", base)
    }

    pub fn metadata_json(base: &str) -> String {
        format!("{}_metadata.json", base)
    }

    pub fn zarr_root(base: &str) -> String {
        format!("{}.zarr", base)
    }

    pub fn with_test_prefix(key: &str) -> String {
        format!("{}/{}", TEST_PREFIX, key)
    }

    /// Apply the test prefix when `testing` is set.
    pub fn scoped(key: &str, testing: bool) -> String {
        if testing {
            Self::with_test_prefix(key)
        } else {
            key.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_keys() {
        assert_eq!(ProductKey::geotiff("test-chain"), "test-chain.tif");
        assert_eq!(
            ProductKey::metadata_json("test-chain"),
            "test-chain_metadata.json"
        );
        assert_eq!(ProductKey::zarr_root("test-chain"), "test-chain.zarr");
    }

    #[test]
    fn test_nested_base_key() {
        assert_eq!(
            ProductKey::geotiff("products/S2A/MSI/L2A/2022/03/id/20220315/ndvi"),
            "products/S2A/MSI/L2A/2022/03/id/20220315/ndvi.tif"
        );
    }

    #[test]
    fn test_scoped() {
        assert_eq!(ProductKey::scoped("a/b.tif", false), "a/b.tif");
        assert_eq!(ProductKey::scoped("a/b.tif", true), "_test/a/b.tif");
    }
}
