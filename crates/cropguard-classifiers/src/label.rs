//! Class label parsing
//!
//! Labels follow the `<Crop>___<Disease>` convention of the training dataset,
//! e.g. `Tomato___Late_blight` or `Corn_(maize)___Common_rust_`.

use cropguard_core::ParsedLabel;

/// Separator between the crop and disease components
pub const LABEL_SEPARATOR: &str = "___";

/// Split a label on the first [`LABEL_SEPARATOR`].
///
/// Everything after the first separator is the disease, so a label with
/// several separators keeps the later ones in its disease part. A label
/// without a separator is a bare crop with an empty disease.
pub fn parse_label(label: &str) -> ParsedLabel {
    match label.split_once(LABEL_SEPARATOR) {
        Some((crop, disease)) => ParsedLabel::new(crop, disease),
        None => ParsedLabel::new(label, ""),
    }
}
