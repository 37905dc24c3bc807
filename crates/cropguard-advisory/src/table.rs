//! Curated advisory table
//!
//! Entries are keyed by the full class label (`Crop___Disease`) and kept in
//! insertion order; the partial-match rule scans them front to back.

use cropguard_core::{AdvisoryRecord, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One curated record and the class label it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryEntry {
    /// Class label, e.g. `Tomato___Late_blight`
    pub key: String,

    #[serde(flatten)]
    pub record: AdvisoryRecord,
}

/// Ordered crop/disease advisory table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvisoryTable {
    entries: Vec<AdvisoryEntry>,
}

impl AdvisoryTable {
    /// Table with the built-in curated entries
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|advice| AdvisoryEntry {
                key: advice.key.to_string(),
                record: AdvisoryRecord {
                    disease_description: advice.disease_description.to_string(),
                    symptoms: advice.symptoms.to_string(),
                    treatment_organic: advice.treatment_organic.to_string(),
                    treatment_chemical: advice.treatment_chemical.to_string(),
                    preventive_measures: advice.preventive_measures.to_string(),
                },
            })
            .collect();
        Self { entries }
    }

    /// Table from explicit entries; a repeated key keeps its first position
    /// and takes the later record
    pub fn from_entries(entries: impl IntoIterator<Item = AdvisoryEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    /// Load entries from a YAML list
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let entries: Vec<AdvisoryEntry> = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid advisory table: {}", e)))?;

        for entry in &entries {
            if entry.key.trim().is_empty() {
                return Err(Error::config("Advisory entry has an empty key"));
            }
            if !entry.record.is_complete() {
                return Err(Error::config(format!(
                    "Advisory entry '{}' has empty fields",
                    entry.key
                )));
            }
        }

        Ok(Self::from_entries(entries))
    }

    /// Load entries from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read advisory table {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Add or replace an entry
    pub fn insert(&mut self, entry: AdvisoryEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => existing.record = entry.record,
            None => self.entries.push(entry),
        }
    }

    /// Overlay another table: shared keys are replaced in place, new keys appended
    pub fn merge(&mut self, other: AdvisoryTable) {
        for entry in other.entries {
            self.insert(entry);
        }
    }

    /// Record stored under exactly `key`
    pub fn get(&self, key: &str) -> Option<&AdvisoryRecord> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.record)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AdvisoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct StaticAdvice {
    key: &'static str,
    disease_description: &'static str,
    symptoms: &'static str,
    treatment_organic: &'static str,
    treatment_chemical: &'static str,
    preventive_measures: &'static str,
}

const BUILTIN: &[StaticAdvice] = &[
    StaticAdvice {
        key: "Apple___Apple_scab",
        disease_description: "Fungal disease causing olive-brown spots on apple leaves and fruits.",
        symptoms: "Velvety dark spots on leaves, distorted fruits, premature leaf fall.",
        treatment_organic: "Prune infected twigs and branches. Remove fallen leaves. Use sulfur-based \
            fungicidal sprays and neem oil as per local guidelines.",
        treatment_chemical: "Apply recommended systemic fungicides following local agricultural \
            department guidelines and pre-harvest intervals.",
        preventive_measures: "Plant resistant varieties where possible, maintain proper spacing for \
            air circulation, and avoid overhead irrigation late in the day.",
    },
    StaticAdvice {
        key: "Potato___Early_blight",
        disease_description: "Fungal disease causing concentric ring spots and defoliation in potato.",
        symptoms: "Dark brown concentric spots on older leaves, yellowing, premature defoliation.",
        treatment_organic: "Remove affected leaves. Improve soil health with compost. Use copper-based \
            or biological fungicides, and ensure crop rotation.",
        treatment_chemical: "Apply recommended protectant fungicides (e.g., mancozeb-type compounds) \
            as per local extension recommendations.",
        preventive_measures: "Use certified seed, avoid overhead irrigation, maintain proper spacing \
            and rotate with non-host crops.",
    },
    StaticAdvice {
        key: "Potato___Late_blight",
        disease_description: "Serious disease of potato causing leaf blight and tuber rot.",
        symptoms: "Water-soaked lesions on leaves, white fungal growth on undersides, tuber rot.",
        treatment_organic: "Remove and destroy severely infected plants. Use biofungicides and \
            ensure good field drainage.",
        treatment_chemical: "Use recommended systemic fungicides at early signs of infection, \
            following label instructions and local regulations.",
        preventive_measures: "Plant tolerant varieties, avoid late planting in disease-prone areas, \
            ensure proper hilling and field drainage.",
    },
    StaticAdvice {
        key: "Tomato___Late_blight",
        disease_description: "Highly destructive fungal disease of tomato foliage and fruit.",
        symptoms: "Dark water-soaked lesions on leaves and stems, white fungal growth in humid \
            conditions.",
        treatment_organic: "Remove infected plant parts, avoid overhead irrigation, and apply \
            approved biofungicides.",
        treatment_chemical: "Use recommended fungicides in rotation to avoid resistance, always \
            respect safety intervals and dosage.",
        preventive_measures: "Plant resistant varieties, maintain field hygiene, ensure good air \
            circulation.",
    },
    StaticAdvice {
        key: "Tomato___Leaf_Mold",
        disease_description: "Fungal disease causing yellow spots and mold growth on leaves.",
        symptoms: "Yellow spots on upper leaf surfaces and olive-green mold below; leaves may curl \
            and drop.",
        treatment_organic: "Improve ventilation in greenhouses, prune lower leaves, and use sulfur or \
            biofungicides approved for tomato.",
        treatment_chemical: "Use recommended fungicides according to local guidelines and rotate \
            active ingredients.",
        preventive_measures: "Avoid high humidity, provide good air movement, and avoid overhead \
            irrigation.",
    },
    StaticAdvice {
        key: "Corn_(maize)___Common_rust_",
        disease_description: "Rust disease of maize causing reddish-brown pustules on leaves.",
        symptoms: "Small elongated pustules on both leaf surfaces that later turn dark.",
        treatment_organic: "Use resistant varieties where available, and remove severely infected \
            plants when feasible.",
        treatment_chemical: "Apply recommended fungicides if disease pressure is high, depending on \
            local guidelines.",
        preventive_measures: "Rotate crops, avoid dense planting, and monitor fields regularly.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, text: &str) -> AdvisoryEntry {
        AdvisoryEntry {
            key: key.to_string(),
            record: AdvisoryRecord {
                disease_description: text.to_string(),
                symptoms: text.to_string(),
                treatment_organic: text.to_string(),
                treatment_chemical: text.to_string(),
                preventive_measures: text.to_string(),
            },
        }
    }

    #[test]
    fn test_builtin_order_and_completeness() {
        let table = AdvisoryTable::builtin();
        let keys: Vec<&str> = table.iter().map(|e| e.key.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "Apple___Apple_scab",
                "Potato___Early_blight",
                "Potato___Late_blight",
                "Tomato___Late_blight",
                "Tomato___Leaf_Mold",
                "Corn_(maize)___Common_rust_",
            ]
        );
        assert!(table.iter().all(|e| e.record.is_complete()));
    }

    #[test]
    fn test_continuation_lines_collapse() {
        let table = AdvisoryTable::builtin();
        let record = table.get("Apple___Apple_scab").unwrap();
        assert!(record
            .treatment_organic
            .contains("Use sulfur-based fungicidal sprays"));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut table = AdvisoryTable::from_entries([entry("A___x", "one"), entry("B___y", "two")]);
        table.insert(entry("A___x", "three"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.iter().next().unwrap().key, "A___x");
        assert_eq!(table.get("A___x").unwrap().symptoms, "three");
    }

    #[test]
    fn test_merge_appends_new_keys() {
        let mut table = AdvisoryTable::builtin();
        table.merge(AdvisoryTable::from_entries([
            entry("Grape___Black_rot", "rot"),
            entry("Apple___Apple_scab", "custom"),
        ]));

        assert_eq!(table.len(), 7);
        assert_eq!(table.iter().last().unwrap().key, "Grape___Black_rot");
        assert_eq!(table.iter().next().unwrap().record.symptoms, "custom");
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
- key: Grape___Black_rot
  disease_description: Fungal disease of grape.
  symptoms: Brown circular lesions.
  treatment_organic: Remove mummified berries.
  treatment_chemical: Apply labeled fungicides.
  preventive_measures: Prune for airflow.
"#;
        let table = AdvisoryTable::from_yaml(yaml).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("Grape___Black_rot").unwrap().symptoms,
            "Brown circular lesions."
        );
    }

    #[test]
    fn test_from_yaml_rejects_incomplete_entries() {
        let yaml = r#"
- key: Grape___Black_rot
  disease_description: Fungal disease of grape.
  symptoms: ""
  treatment_organic: Remove mummified berries.
  treatment_chemical: Apply labeled fungicides.
  preventive_measures: Prune for airflow.
"#;
        let err = AdvisoryTable::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        assert!(AdvisoryTable::from_yaml("- key: A___b").is_err());
        assert!(AdvisoryTable::from_file("/no/such/advisory.yaml").is_err());
    }
}
