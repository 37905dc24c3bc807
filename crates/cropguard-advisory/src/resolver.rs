//! Recommendation resolution
//!
//! Maps a crop/disease pair to an [`AdvisoryRecord`]. The first rule that
//! matches wins:
//!
//! 1. healthy: empty, blank or `healthy` disease
//! 2. exact: `crop___disease` is a table key
//! 3. normalized: keys compared after whitespace/underscore normalization
//! 4. partial: first key (table order) containing both names, case-insensitive
//! 5. fallback: generic advice naming the crop and disease
//!
//! Resolution never fails.

use crate::table::AdvisoryTable;
use cropguard_core::{AdvisoryRecord, MatchTier, ParsedLabel};
use tracing::{debug, warn};

/// Separator between crop and disease in table keys
const KEY_SEPARATOR: &str = "___";

/// A resolved record and the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: AdvisoryRecord,
    pub tier: MatchTier,
}

/// Resolves crop/disease pairs against an [`AdvisoryTable`]
#[derive(Debug, Clone)]
pub struct AdvisoryResolver {
    table: AdvisoryTable,
    /// Normalized form of each table key, in table order
    normalized_keys: Vec<String>,
}

impl Default for AdvisoryResolver {
    fn default() -> Self {
        Self::new(AdvisoryTable::builtin())
    }
}

impl AdvisoryResolver {
    pub fn new(table: AdvisoryTable) -> Self {
        let normalized_keys = table.iter().map(|e| normalize_key(&e.key)).collect();
        Self {
            table,
            normalized_keys,
        }
    }

    pub fn table(&self) -> &AdvisoryTable {
        &self.table
    }

    /// Resolve a parsed class label
    pub fn resolve_label(&self, label: &ParsedLabel) -> Resolution {
        self.resolve(&label.crop, &label.disease)
    }

    /// Resolve a crop/disease pair
    pub fn resolve(&self, crop: &str, disease: &str) -> Resolution {
        let crop = crop.trim();
        let disease = disease.trim();

        if is_healthy(disease) {
            debug!("No disease reported for '{}', using healthy advice", crop);
            return Resolution {
                record: healthy_record(crop),
                tier: MatchTier::Healthy,
            };
        }

        let key = format!("{}{}{}", crop, KEY_SEPARATOR, disease);
        if let Some(record) = self.table.get(&key) {
            return self.resolved(record, MatchTier::Exact, &key);
        }

        let normalized = normalize_key(&key);
        if let Some(entry) = self
            .table
            .iter()
            .zip(&self.normalized_keys)
            .find(|(_, n)| **n == normalized)
            .map(|(entry, _)| entry)
        {
            return self.resolved(&entry.record, MatchTier::Normalized, &entry.key);
        }

        let crop_lower = crop.to_lowercase();
        let disease_lower = disease.to_lowercase();
        if let Some(entry) = self.table.iter().find(|entry| {
            let key = entry.key.to_lowercase();
            key.contains(&crop_lower) && key.contains(&disease_lower)
        }) {
            return self.resolved(&entry.record, MatchTier::Partial, &entry.key);
        }

        warn!(
            "No curated advice for crop '{}' and disease '{}', using generic advice",
            crop, disease
        );
        Resolution {
            record: fallback_record(crop, disease),
            tier: MatchTier::Fallback,
        }
    }

    fn resolved(&self, record: &AdvisoryRecord, tier: MatchTier, key: &str) -> Resolution {
        debug!("Advice for '{}' resolved by {} match", key, tier.as_str());
        Resolution {
            record: record.clone(),
            tier,
        }
    }
}

fn is_healthy(disease: &str) -> bool {
    disease.is_empty() || disease.eq_ignore_ascii_case("healthy")
}

/// Canonical form of a `crop___disease` key.
///
/// Each side of the first separator has whitespace turned into `_`, runs of
/// `_` collapsed to one, and edge `_` trimmed. The sides are then rejoined
/// with the separator, so `"Corn_(maize)___Common rust"` and
/// `"Corn_(maize)___Common_rust_"` share a canonical form.
pub fn normalize_key(key: &str) -> String {
    match key.split_once(KEY_SEPARATOR) {
        Some((crop, disease)) => format!(
            "{}{}{}",
            normalize_component(crop),
            KEY_SEPARATOR,
            normalize_component(disease)
        ),
        None => normalize_component(key),
    }
}

fn normalize_component(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        let c = if c.is_whitespace() { '_' } else { c };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

/// Advice returned when no disease was detected
pub fn healthy_record(crop: &str) -> AdvisoryRecord {
    AdvisoryRecord {
        disease_description: format!(
            "The {} crop appears to be healthy with no signs of disease detected.",
            crop
        ),
        symptoms: "No symptoms detected. The crop appears healthy.".to_string(),
        treatment_organic:
            "No treatment needed. Continue with regular healthy crop management practices."
                .to_string(),
        treatment_chemical: "No chemical treatment needed. Maintain good agricultural practices \
            to prevent future disease outbreaks."
            .to_string(),
        preventive_measures: format!(
            "Keep monitoring the {} crop regularly, rotate crops, and maintain field hygiene \
            to keep it disease-free.",
            crop
        ),
    }
}

/// Generic advice for a disease without a curated entry
pub fn fallback_record(crop: &str, disease: &str) -> AdvisoryRecord {
    AdvisoryRecord {
        disease_description: format!(
            "The system detected a potential issue with {} crop. Detected condition: {}. \
            Detailed information for this specific disease is not available in the rule base.",
            crop, disease
        ),
        symptoms: "Check for spots, discoloration, wilting, or unusual growth on leaves and \
            stems. Consult with an agricultural expert for specific symptoms of this condition."
            .to_string(),
        treatment_organic: "Remove and safely dispose of heavily infected plant parts. Maintain \
            field hygiene and improve soil health with compost or organic amendments. Consider \
            consulting with a local agricultural extension officer for organic treatment options."
            .to_string(),
        treatment_chemical: "Consult a local agricultural extension officer or certified \
            agronomist for appropriate and safe chemical treatment based on local \
            recommendations. Always follow label instructions and safety guidelines."
            .to_string(),
        preventive_measures: "Use disease-free seed and seedlings, practice crop rotation, \
            maintain proper spacing and irrigation, and monitor the field regularly. Implement \
            good agricultural practices to prevent disease spread."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::AdvisoryEntry;

    fn resolver() -> AdvisoryResolver {
        AdvisoryResolver::default()
    }

    #[test]
    fn test_exact_match() {
        let resolution = resolver().resolve("Apple", "Apple_scab");
        assert_eq!(resolution.tier, MatchTier::Exact);
        assert!(resolution
            .record
            .disease_description
            .contains("olive-brown spots"));
    }

    #[test]
    fn test_inputs_are_trimmed() {
        let resolution = resolver().resolve("  Potato ", " Late_blight\n");
        assert_eq!(resolution.tier, MatchTier::Exact);
        assert!(resolution.record.symptoms.contains("tuber rot"));
    }

    #[test]
    fn test_healthy_variants() {
        for disease in ["", " ", "healthy", "HEALTHY", " Healthy "] {
            let resolution = resolver().resolve("Apple", disease);
            assert_eq!(resolution.tier, MatchTier::Healthy, "disease {:?}", disease);
            assert!(resolution.record.disease_description.contains("Apple"));
            assert!(resolution.record.is_complete());
        }
    }

    #[test]
    fn test_normalized_match() {
        let resolution = resolver().resolve("Corn_(maize)", "Common rust");
        assert_eq!(resolution.tier, MatchTier::Normalized);
        assert!(resolution.record.symptoms.contains("pustules"));

        let resolution = resolver().resolve("Tomato", "Leaf  Mold");
        assert_eq!(resolution.tier, MatchTier::Normalized);
    }

    #[test]
    fn test_partial_match_is_case_insensitive() {
        let resolution = resolver().resolve("tomato", "leaf_mold");
        assert_eq!(resolution.tier, MatchTier::Partial);
        assert!(resolution.record.symptoms.contains("olive-green mold"));
    }

    #[test]
    fn test_partial_match_prefers_table_order() {
        // Both potato blights contain "potato" and "blight"; the earlier entry wins.
        let resolution = resolver().resolve("Potato", "blight");
        assert_eq!(resolution.tier, MatchTier::Partial);
        assert_eq!(
            &resolution.record,
            resolver().table().get("Potato___Early_blight").unwrap()
        );
    }

    #[test]
    fn test_fallback_names_crop_and_disease() {
        let resolution = resolver().resolve("Grape", "Black_rot");
        assert_eq!(resolution.tier, MatchTier::Fallback);
        assert!(resolution.record.is_complete());
        assert!(resolution.record.disease_description.contains("Grape"));
        assert!(resolution.record.disease_description.contains("Black_rot"));
    }

    #[test]
    fn test_custom_table() {
        let table = AdvisoryTable::from_entries([AdvisoryEntry {
            key: "Grape___Black_rot".to_string(),
            record: fallback_record("x", "y"),
        }]);
        let resolver = AdvisoryResolver::new(table);

        assert_eq!(resolver.resolve("Grape", "Black_rot").tier, MatchTier::Exact);
        assert_eq!(
            resolver.resolve("Apple", "Apple_scab").tier,
            MatchTier::Fallback
        );
    }

    #[test]
    fn test_resolve_label() {
        let label = ParsedLabel::new("Tomato", "Late_blight");
        assert_eq!(resolver().resolve_label(&label).tier, MatchTier::Exact);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Corn_(maize)___Common_rust_"), "Corn_(maize)___Common_rust");
        assert_eq!(normalize_key("Corn_(maize)___Common rust"), "Corn_(maize)___Common_rust");
        assert_eq!(normalize_key("Tomato___Leaf__Mold"), "Tomato___Leaf_Mold");
        assert_eq!(normalize_key(" Apple "), "Apple");
    }
}
