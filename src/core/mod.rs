// Duplicate resolution and presence classification.
//
// - `index` - duplicate groups fetched once per run
// - `priority` - trust order of storage locations
// - `scoring` - picks the best copy within one location
// - `resolver` - converges each group on a single visible copy
// - `presence` - which assets exist in only one library

pub mod index;
pub mod presence;
pub mod priority;
pub mod resolver;
pub mod scoring;

#[cfg(test)]
pub(crate) mod test_support;

pub use index::DuplicateIndex;
pub use presence::{PresenceClassifier, SingleStored};
pub use priority::PriorityRanker;
pub use resolver::{
    GroupDecision, GroupPlan, GroupResolution, MutationFailure, ResolutionEngine,
    ResolutionReport, SkippedGroup, plan_group,
};
pub use scoring::QualityScorer;
