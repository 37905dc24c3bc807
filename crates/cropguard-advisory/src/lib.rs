//! CropGuard Advisory
//!
//! Treatment and prevention advice for detected crop diseases.
//!
//! A curated [`AdvisoryTable`] holds records keyed by class label. The
//! [`AdvisoryResolver`] looks a crop/disease pair up through a fixed ladder
//! of match rules (healthy, exact, normalized, partial, fallback) and always
//! returns a complete record together with the [`MatchTier`] that produced it.
//!
//! Extra entries can be loaded from YAML and merged over the built-in table.
//!
//! [`MatchTier`]: cropguard_core::MatchTier

pub mod resolver;
pub mod table;

pub use resolver::{fallback_record, healthy_record, normalize_key, AdvisoryResolver, Resolution};
pub use table::{AdvisoryEntry, AdvisoryTable};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::resolver::{AdvisoryResolver, Resolution};
    pub use crate::table::{AdvisoryEntry, AdvisoryTable};
}
