//! Class index loading and normalization
//!
//! Training exports the label map either as `{"0": "Apple___Apple_scab", ...}`
//! or as `{"Apple___Apple_scab": 0, ...}`. Both are normalized here into a
//! dense `index -> label` table.

use cropguard_core::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk encoding of a class-index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassIndexFormat {
    /// Keys are stringified indices, values are labels
    IndexKeyed,
    /// Keys are labels, values are integer indices
    LabelKeyed,
}

impl ClassIndexFormat {
    /// Determine the encoding from a representative key of the raw mapping.
    ///
    /// Returns `None` for an empty mapping.
    pub fn detect(raw: &Map<String, Value>) -> Option<Self> {
        let key = raw.keys().next()?;
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self::IndexKeyed)
        } else {
            Some(Self::LabelKeyed)
        }
    }
}

/// Dense mapping from class index (0..N-1) to label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIndexMap {
    labels: Vec<String>,
    format: ClassIndexFormat,
}

impl ClassIndexMap {
    /// Load and normalize a class-index JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read class index file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Parse and normalize a class-index JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Class index file is not valid JSON: {}", e)))?;

        match value {
            Value::Object(raw) => Self::from_raw(&raw),
            other => Err(Error::config(format!(
                "Class index file must contain a JSON object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Normalize an already-deserialized mapping
    pub fn from_raw(raw: &Map<String, Value>) -> Result<Self> {
        let format = ClassIndexFormat::detect(raw)
            .ok_or_else(|| Error::config("Class index file is empty"))?;

        let by_index = match format {
            ClassIndexFormat::IndexKeyed => index_keyed(raw)?,
            ClassIndexFormat::LabelKeyed => invert_label_keyed(raw)?,
        };

        // BTreeMap keys are sorted and unique, so density reduces to key == position.
        if let Some((position, index)) = by_index
            .keys()
            .enumerate()
            .find(|(position, index)| position != *index)
        {
            return Err(Error::config(format!(
                "Class indices must be dense from 0 to {}: index {} is missing (found {})",
                by_index.len() - 1,
                position,
                index
            )));
        }

        Ok(Self {
            labels: by_index.into_values().collect(),
            format,
        })
    }

    /// Build a map directly from labels ordered by index
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::config("Class index must contain at least one label"));
        }
        Ok(Self {
            labels,
            format: ClassIndexFormat::IndexKeyed,
        })
    }

    /// Label for a class index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Number of classes; sizes the classification head
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Encoding the map was loaded from
    pub fn format(&self) -> ClassIndexFormat {
        self.format
    }

    /// Iterate `(index, label)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(String::as_str).enumerate()
    }

    /// Labels ordered by index
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

fn index_keyed(raw: &Map<String, Value>) -> Result<BTreeMap<usize, String>> {
    let mut by_index = BTreeMap::new();

    for (key, value) in raw {
        let index: usize = key.parse().map_err(|_| {
            Error::config(format!(
                "Class index key '{}' is not an integer (file uses numeric keys)",
                key
            ))
        })?;

        let label = value.as_str().ok_or_else(|| {
            Error::config(format!(
                "Class index {} maps to {}, expected a label string",
                index,
                json_type_name(value)
            ))
        })?;

        // Keys like "1" and "01" parse to the same index.
        if let Some(previous) = by_index.insert(index, label.to_string()) {
            return Err(Error::config(format!(
                "Duplicate class index {} ('{}' and '{}')",
                index, previous, label
            )));
        }
    }

    Ok(by_index)
}

fn invert_label_keyed(raw: &Map<String, Value>) -> Result<BTreeMap<usize, String>> {
    let mut by_index = BTreeMap::new();

    for (label, value) in raw {
        let index = value
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| {
                Error::config(format!(
                    "Label '{}' maps to {}, expected a non-negative integer index",
                    label, value
                ))
            })?;

        if let Some(previous) = by_index.insert(index, label.clone()) {
            return Err(Error::config(format!(
                "Duplicate class index {}: claimed by both '{}' and '{}'",
                index, previous, label
            )));
        }
    }

    Ok(by_index)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_index_keyed() {
        let map = ClassIndexMap::from_json_str(r#"{"0": "A", "1": "B"}"#).unwrap();
        assert_eq!(map.format(), ClassIndexFormat::IndexKeyed);
        assert_eq!(map.get(0), Some("A"));
        assert_eq!(map.get(1), Some("B"));
        assert_eq!(map.num_classes(), 2);
    }

    #[test]
    fn test_label_keyed_matches_index_keyed() {
        let index_keyed = ClassIndexMap::from_json_str(r#"{"0": "A", "1": "B"}"#).unwrap();
        let label_keyed = ClassIndexMap::from_json_str(r#"{"A": 0, "B": 1}"#).unwrap();

        assert_eq!(label_keyed.format(), ClassIndexFormat::LabelKeyed);
        assert_eq!(index_keyed.labels(), label_keyed.labels());
    }

    #[test]
    fn test_multi_digit_indices_sort_numerically() {
        let json = (0..12)
            .map(|i| format!("\"{}\": \"class_{}\"", i, i))
            .collect::<Vec<_>>()
            .join(",");
        let map = ClassIndexMap::from_json_str(&format!("{{{}}}", json)).unwrap();

        assert_eq!(map.len(), 12);
        assert_eq!(map.get(2), Some("class_2"));
        assert_eq!(map.get(10), Some("class_10"));
    }

    #[test]
    fn test_empty_is_config_error() {
        let err = ClassIndexMap::from_json_str("{}").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_not_an_object() {
        let err = ClassIndexMap::from_json_str(r#"["A", "B"]"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let err = ClassIndexMap::from_json_str(r#"{"A": 0, "B": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("Duplicate class index 0"));
    }

    #[test]
    fn test_gap_rejected() {
        let err = ClassIndexMap::from_json_str(r#"{"0": "A", "2": "C"}"#).unwrap_err();
        assert!(err.to_string().contains("index 1 is missing"));

        let err = ClassIndexMap::from_json_str(r#"{"A": 1, "B": 2}"#).unwrap_err();
        assert!(err.to_string().contains("index 0 is missing"));
    }

    #[test]
    fn test_mixed_keys_rejected() {
        let err = ClassIndexMap::from_json_str(r#"{"0": "A", "B": "1"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(ClassIndexMap::from_json_str(r#"{"0": 5}"#).is_err());
        assert!(ClassIndexMap::from_json_str(r#"{"A": "zero"}"#).is_err());
        assert!(ClassIndexMap::from_json_str(r#"{"A": -1}"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ClassIndexMap::from_file("/definitely/not/here/class_indices.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("/definitely/not/here/class_indices.json"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_indices.json");
        std::fs::write(&path, r#"{"Tomato___healthy": 1, "Apple___Apple_scab": 0}"#).unwrap();

        let map = ClassIndexMap::from_file(&path).unwrap();
        assert_eq!(map.get(0), Some("Apple___Apple_scab"));
        assert_eq!(map.get(1), Some("Tomato___healthy"));
    }

    #[test]
    fn test_from_labels() {
        let map = ClassIndexMap::from_labels(["A", "B", "C"]).unwrap();
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(0, "A"), (1, "B"), (2, "C")]);
        assert!(ClassIndexMap::from_labels(Vec::<String>::new()).is_err());
    }

    proptest! {
        #[test]
        fn prop_encodings_agree_and_are_deterministic(
            labels in proptest::collection::btree_set("[A-Za-z][A-Za-z_]{0,12}___[A-Za-z_]{1,12}", 1..24)
        ) {
            let labels: Vec<String> = labels.into_iter().collect();

            let index_keyed: Map<String, Value> = labels
                .iter()
                .enumerate()
                .map(|(i, l)| (i.to_string(), Value::from(l.clone())))
                .collect();
            let label_keyed: Map<String, Value> = labels
                .iter()
                .enumerate()
                .map(|(i, l)| (l.clone(), Value::from(i)))
                .collect();

            let a = ClassIndexMap::from_raw(&index_keyed).unwrap();
            let b = ClassIndexMap::from_raw(&index_keyed).unwrap();
            let c = ClassIndexMap::from_raw(&label_keyed).unwrap();

            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.labels(), c.labels());
            prop_assert_eq!(a.labels(), labels.as_slice());
        }
    }
}
