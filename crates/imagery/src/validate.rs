//! Imagery validation before upload.

use exporter::geotiff::DecodedGeoTiff;

/// Whether every band holds a single value.
///
/// Fully constant imagery (all bands 0, or all 255) is what the
/// Process API returns for an empty acquisition window and is not
/// worth storing. Comparison is bitwise so NaN-filled bands count as
/// constant too.
pub fn all_bands_constant(decoded: &DecodedGeoTiff) -> bool {
    if decoded.bands == 0 || decoded.width * decoded.height == 0 {
        return true;
    }
    (0..decoded.bands).all(|band| {
        let first = decoded.sample(band, 0, 0).to_bits();
        decoded
            .band_values(band)
            .iter()
            .all(|v| v.to_bits() == first)
    })
}
