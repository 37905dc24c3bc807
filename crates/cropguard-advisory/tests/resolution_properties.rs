//! Property tests for advisory resolution

use cropguard_advisory::prelude::*;
use cropguard_advisory::normalize_key;
use cropguard_core::MatchTier;
use proptest::prelude::*;
use std::io::Write;

proptest! {
    #[test]
    fn prop_always_complete(crop in "\\PC{0,24}", disease in "\\PC{0,32}") {
        let resolution = AdvisoryResolver::default().resolve(&crop, &disease);
        prop_assert!(resolution.record.is_complete());
    }

    #[test]
    fn prop_blank_disease_is_healthy(crop in "[A-Za-z_]{1,16}", blank in "[ \\t]{0,4}") {
        let resolution = AdvisoryResolver::default().resolve(&crop, &blank);
        prop_assert_eq!(resolution.tier, MatchTier::Healthy);
        prop_assert!(resolution.record.disease_description.contains(crop.as_str()));
    }

    #[test]
    fn prop_every_builtin_key_resolves_exactly(index in 0usize..6) {
        let resolver = AdvisoryResolver::default();
        let entry = resolver.table().iter().nth(index).unwrap().clone();
        let (crop, disease) = entry.key.split_once("___").unwrap();

        let resolution = resolver.resolve(crop, disease);
        prop_assert_eq!(resolution.tier, MatchTier::Exact);
        prop_assert_eq!(resolution.record, entry.record);
    }

    #[test]
    fn prop_normalization_is_idempotent(key in "[A-Za-z _()]{0,12}(___[A-Za-z _]{0,12})?") {
        let once = normalize_key(&key);
        prop_assert_eq!(normalize_key(&once), once.clone());
    }

    #[test]
    fn prop_resolution_is_deterministic(crop in "[A-Za-z]{0,10}", disease in "[A-Za-z_ ]{0,16}") {
        let resolver = AdvisoryResolver::default();
        prop_assert_eq!(resolver.resolve(&crop, &disease), resolver.resolve(&crop, &disease));
    }
}

#[test]
fn test_file_overlay() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
- key: Grape___Black_rot
  disease_description: Fungal disease of grapevines.
  symptoms: Tan leaf spots with dark borders, shriveled black berries.
  treatment_organic: Remove mummified fruit and infected canes.
  treatment_chemical: Apply labeled protectant fungicides from bud break.
  preventive_measures: Prune for airflow and keep the canopy open.
"#
    )
    .unwrap();

    let mut table = AdvisoryTable::builtin();
    table.merge(AdvisoryTable::from_file(file.path()).unwrap());
    let resolver = AdvisoryResolver::new(table);

    let resolution = resolver.resolve("Grape", "Black_rot");
    assert_eq!(resolution.tier, MatchTier::Exact);
    assert!(resolution.record.symptoms.contains("black berries"));

    assert_eq!(resolver.resolve("Apple", "Apple_scab").tier, MatchTier::Exact);
}
