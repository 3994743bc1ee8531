use crate::catalog::Catalog;
use crate::core::index::DuplicateIndex;
use crate::core::priority::PriorityRanker;
use crate::core::scoring::QualityScorer;
use crate::error::CullError;
use crate::models::{Asset, DuplicateGroup, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// What to do with one duplicate group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupDecision {
    /// No member lives under a listed prefix; the group is left alone.
    Ambiguous { unlisted_prefixes: Vec<String> },
    /// Every member is hidden or locked; there is nothing the engine may change.
    Untouchable,
    Resolve(GroupPlan),
}

/// Mutations that bring a group to exactly one visible copy. Empty lists mean
/// the group has already converged.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPlan {
    pub blessed_prefix: String,
    pub keeper: String,
    pub archive: Vec<String>,
    pub restore: Vec<String>,
}

impl GroupPlan {
    pub fn is_converged(&self) -> bool {
        self.archive.is_empty() && self.restore.is_empty()
    }
}

/// A group the engine could not decide on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub duplicate_id: String,
    pub unlisted_prefixes: Vec<String>,
}

/// A visibility batch the catalog rejected. The rest of that group was abandoned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationFailure {
    pub duplicate_id: String,
    pub visibility: Visibility,
    pub asset_ids: Vec<String>,
    pub reason: String,
}

/// Mutations that were actually applied to one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResolution {
    pub duplicate_id: String,
    pub blessed_prefix: String,
    pub keeper: String,
    pub archived: Vec<String>,
    pub restored: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub groups_processed: usize,
    pub archived_count: usize,
    pub restored_count: usize,
    pub skipped_count: usize,
    pub skipped: Vec<SkippedGroup>,
    pub failures: Vec<MutationFailure>,
    pub resolutions: Vec<GroupResolution>,
}

/// Decide the fate of one group.
///
/// Phase A hides every visible copy outside the blessed location, whatever its
/// quality. Phase B keeps the best blessed copy and hides the other blessed copies.
/// A keeper that is archived is restored, even when it is the only blessed copy.
/// Hidden and locked members are never candidates and never mutated.
pub fn plan_group(ranker: &PriorityRanker, group: &DuplicateGroup) -> GroupDecision {
    let managed: Vec<&Asset> = group.assets.iter().filter(|a| a.is_managed()).collect();
    if managed.is_empty() {
        return GroupDecision::Untouchable;
    }

    let Some(blessed) = ranker.blessed_prefix(managed.iter().copied()) else {
        let unlisted_prefixes = managed
            .iter()
            .map(|asset| PriorityRanker::prefix_of(&asset.original_path))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        return GroupDecision::Ambiguous { unlisted_prefixes };
    };

    let (blessed_copies, elsewhere): (Vec<&Asset>, Vec<&Asset>) = managed
        .into_iter()
        .partition(|asset| PriorityRanker::prefix_of(&asset.original_path) == blessed);

    let mut archive: Vec<String> = elsewhere
        .iter()
        .filter(|asset| asset.is_visible())
        .map(|asset| asset.id.clone())
        .collect();

    // blessed_prefix is always held by at least one member
    let Some(keeper) = QualityScorer::best_copy(&blessed_copies) else {
        return GroupDecision::Ambiguous {
            unlisted_prefixes: Vec::new(),
        };
    };

    archive.extend(
        blessed_copies
            .iter()
            .filter(|asset| asset.id != keeper.id && asset.is_visible())
            .map(|asset| asset.id.clone()),
    );

    let restore = if keeper.is_visible() {
        Vec::new()
    } else {
        vec![keeper.id.clone()]
    };

    GroupDecision::Resolve(GroupPlan {
        blessed_prefix: blessed.to_string(),
        keeper: keeper.id.clone(),
        archive,
        restore,
    })
}

/// Converges every duplicate group on one visible copy in its most trusted location.
pub struct ResolutionEngine<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    ranker: &'a PriorityRanker,
}

impl<'a, C: Catalog + ?Sized> ResolutionEngine<'a, C> {
    pub fn new(catalog: &'a C, ranker: &'a PriorityRanker) -> Self {
        Self { catalog, ranker }
    }

    /// Index the catalog's duplicates and resolve every group.
    ///
    /// Fails only if the duplicate listing cannot be read, before any mutation.
    /// Rejected mutations are reported, not raised.
    pub fn resolve_all(&self) -> Result<ResolutionReport, CullError> {
        let index = DuplicateIndex::build(self.catalog).map_err(|err| match err {
            CullError::IndexUnavailable(source) => CullError::CatalogUnavailable(source),
            other => other,
        })?;
        Ok(self.resolve_with(&index))
    }

    /// Resolve the groups of an already built index, one at a time, in listing order.
    pub fn resolve_with(&self, index: &DuplicateIndex) -> ResolutionReport {
        let mut report = ResolutionReport::default();

        for group in index.all_groups() {
            report.groups_processed += 1;
            match plan_group(self.ranker, group) {
                GroupDecision::Ambiguous { unlisted_prefixes } => {
                    warn!(
                        "Skipping duplicate group {}: none of {:?} is in the priority list",
                        group.duplicate_id, unlisted_prefixes
                    );
                    report.skipped_count += 1;
                    report.skipped.push(SkippedGroup {
                        duplicate_id: group.duplicate_id.clone(),
                        unlisted_prefixes,
                    });
                }
                GroupDecision::Untouchable => {
                    debug!(
                        "Group {} has only hidden or locked members; leaving it alone",
                        group.duplicate_id
                    );
                }
                GroupDecision::Resolve(plan) if plan.is_converged() => {
                    debug!(
                        "Group {} already converged on {} in {}",
                        group.duplicate_id, plan.keeper, plan.blessed_prefix
                    );
                }
                GroupDecision::Resolve(plan) => self.apply(group, plan, &mut report),
            }
        }

        info!(
            "Processed {} group(s): archived {}, restored {}, skipped {}, failed {}",
            report.groups_processed,
            report.archived_count,
            report.restored_count,
            report.skipped_count,
            report.failures.len()
        );
        report
    }

    fn apply(&self, group: &DuplicateGroup, plan: GroupPlan, report: &mut ResolutionReport) {
        let mut applied = GroupResolution {
            duplicate_id: group.duplicate_id.clone(),
            blessed_prefix: plan.blessed_prefix,
            keeper: plan.keeper,
            archived: Vec::new(),
            restored: Vec::new(),
        };

        let batches = [
            (Visibility::Archive, plan.archive),
            (Visibility::Timeline, plan.restore),
        ];
        for (visibility, ids) in batches {
            if ids.is_empty() {
                continue;
            }
            info!(
                "Setting {} cop(ies) in group {} to {} (keeper {} in {})",
                ids.len(),
                group.duplicate_id,
                visibility,
                applied.keeper,
                applied.blessed_prefix
            );
            if let Err(err) = self.catalog.update_visibility(&ids, visibility) {
                warn!(
                    "Failed to set {} on group {}: {}",
                    visibility, group.duplicate_id, err
                );
                report.failures.push(MutationFailure {
                    duplicate_id: group.duplicate_id.clone(),
                    visibility,
                    asset_ids: ids,
                    reason: err.to_string(),
                });
                break;
            }
            match visibility {
                Visibility::Archive => {
                    report.archived_count += ids.len();
                    applied.archived = ids;
                }
                Visibility::Timeline => {
                    report.restored_count += ids.len();
                    applied.restored = ids;
                }
                Visibility::Hidden | Visibility::Locked => {
                    unreachable!("batches only contain archive and timeline")
                }
            }
        }

        if !applied.archived.is_empty() || !applied.restored.is_empty() {
            report.resolutions.push(applied);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::core::test_support::{FlakyCatalog, asset, sized};

    fn ranker() -> PriorityRanker {
        PriorityRanker::new(["/photos/wedding", "/photos/misc"])
    }

    fn catalog(assets: Vec<Asset>) -> FlakyCatalog {
        FlakyCatalog::new(InMemoryCatalog::new(Vec::new(), assets))
    }

    fn visibility_of(catalog: &FlakyCatalog, id: &str) -> Visibility {
        catalog.inner.asset(id).unwrap().visibility
    }

    #[test]
    fn test_copy_outside_blessed_location_is_archived() {
        let catalog = catalog(vec![
            sized(asset("a", "/photos/wedding/a.jpg", Some("d1"), Visibility::Timeline), 500, 10, 10),
            sized(asset("b", "/photos/misc/b.jpg", Some("d1"), Visibility::Timeline), 900, 10, 5),
        ]);
        let ranker = ranker();

        let report = ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        assert_eq!(report.groups_processed, 1);
        assert_eq!(report.archived_count, 1);
        assert_eq!(report.restored_count, 0);
        assert_eq!(visibility_of(&catalog, "a"), Visibility::Timeline);
        assert_eq!(visibility_of(&catalog, "b"), Visibility::Archive);
        assert_eq!(
            *catalog.updates.borrow(),
            vec![(vec!["b".to_string()], Visibility::Archive)]
        );
    }

    #[test]
    fn test_already_converged_group_issues_no_calls() {
        let catalog = catalog(vec![
            sized(asset("a", "/photos/wedding/a.jpg", Some("d1"), Visibility::Archive), 100, 10, 20),
            sized(asset("b", "/photos/wedding/b.jpg", Some("d1"), Visibility::Timeline), 200, 10, 20),
        ]);
        let ranker = ranker();

        let report = ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        assert_eq!(catalog.update_count(), 0);
        assert_eq!(report.groups_processed, 1);
        assert!(report.resolutions.is_empty());
    }

    #[test]
    fn test_archived_keeper_is_restored() {
        let catalog = catalog(vec![
            sized(asset("small", "/photos/wedding/s.jpg", Some("d1"), Visibility::Timeline), 100, 10, 10),
            sized(asset("big", "/photos/wedding/b.jpg", Some("d1"), Visibility::Archive), 100, 40, 40),
            asset("other", "/dropbox/stuff/b.jpg", Some("d1"), Visibility::Timeline),
        ]);
        let ranker = ranker();

        let report = ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        assert_eq!(report.archived_count, 2);
        assert_eq!(report.restored_count, 1);
        assert_eq!(visibility_of(&catalog, "big"), Visibility::Timeline);
        assert_eq!(visibility_of(&catalog, "small"), Visibility::Archive);
        assert_eq!(visibility_of(&catalog, "other"), Visibility::Archive);
        let updates = catalog.updates.borrow();
        assert_eq!(updates[0].1, Visibility::Archive);
        assert_eq!(updates[1], (vec!["big".to_string()], Visibility::Timeline));
        assert_eq!(report.resolutions[0].keeper, "big");
    }

    #[test]
    fn test_lone_archived_blessed_copy_is_restored() {
        let catalog = catalog(vec![
            asset("a", "/photos/misc/a.jpg", Some("d1"), Visibility::Archive),
            asset("b", "/dropbox/stuff/b.jpg", Some("d1"), Visibility::Timeline),
        ]);
        let ranker = ranker();

        ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        assert_eq!(visibility_of(&catalog, "a"), Visibility::Timeline);
        assert_eq!(visibility_of(&catalog, "b"), Visibility::Archive);
    }

    #[test]
    fn test_unlisted_group_is_skipped() {
        let catalog = catalog(vec![
            asset("a", "/dropbox/stuff/a.jpg", Some("d1"), Visibility::Timeline),
            asset("b", "upload/upload/b.jpg", Some("d1"), Visibility::Timeline),
        ]);
        let ranker = ranker();

        let report = ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        assert_eq!(catalog.update_count(), 0);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(
            report.skipped[0].unlisted_prefixes,
            vec!["/dropbox/stuff".to_string(), "upload/upload".to_string()]
        );
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let catalog = catalog(vec![
            sized(asset("a", "/photos/wedding/a.jpg", Some("d1"), Visibility::Archive), 10, 10, 10),
            sized(asset("b", "/photos/wedding/b.jpg", Some("d1"), Visibility::Timeline), 10, 5, 5),
            asset("c", "/photos/misc/c.jpg", Some("d1"), Visibility::Timeline),
            asset("d", "/photos/misc/d.jpg", Some("d2"), Visibility::Timeline),
            asset("e", "/photos/misc/e.jpg", Some("d2"), Visibility::Timeline),
            asset("f", "/elsewhere/x/f.jpg", Some("d3"), Visibility::Timeline),
        ]);
        let ranker = ranker();
        let engine = ResolutionEngine::new(&catalog, &ranker);

        engine.resolve_all().unwrap();
        assert!(catalog.update_count() > 0);
        catalog.reset_updates();

        let second = engine.resolve_all().unwrap();
        assert_eq!(catalog.update_count(), 0);
        assert_eq!(second.archived_count, 0);
        assert_eq!(second.restored_count, 0);
    }

    #[test]
    fn test_resolved_groups_converge_on_one_visible_blessed_copy() {
        let catalog = catalog(vec![
            asset("a", "/photos/misc/a.jpg", Some("d1"), Visibility::Timeline),
            asset("b", "/photos/misc/b.jpg", Some("d1"), Visibility::Timeline),
            asset("c", "/photos/wedding/c.jpg", Some("d1"), Visibility::Archive),
            asset("d", "/photos/wedding/d.jpg", Some("d1"), Visibility::Archive),
            asset("e", "upload/upload/e.jpg", Some("d1"), Visibility::Timeline),
        ]);
        let ranker = ranker();

        ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        let visible: Vec<Asset> = catalog
            .inner
            .assets()
            .into_iter()
            .filter(|a| a.is_visible())
            .collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(
            PriorityRanker::prefix_of(&visible[0].original_path),
            "/photos/wedding"
        );
        assert_eq!(visible[0].id, "c");
    }

    #[test]
    fn test_failed_batch_does_not_stop_next_group() {
        let catalog = catalog(vec![
            asset("a", "/photos/wedding/a.jpg", Some("d1"), Visibility::Archive),
            asset("b", "/photos/misc/b.jpg", Some("d1"), Visibility::Timeline),
            asset("c", "/photos/wedding/c.jpg", Some("d2"), Visibility::Timeline),
            asset("d", "/photos/misc/d.jpg", Some("d2"), Visibility::Timeline),
        ])
        .failing_updates_for("b");
        let ranker = ranker();

        let report = ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].duplicate_id, "d1");
        assert_eq!(report.failures[0].asset_ids, vec!["b".to_string()]);
        // keeper restore for d1 is abandoned after its archive batch failed
        assert_eq!(visibility_of(&catalog, "a"), Visibility::Archive);
        assert_eq!(visibility_of(&catalog, "d"), Visibility::Archive);
        assert_eq!(report.archived_count, 1);
        assert_eq!(report.resolutions.len(), 1);
        assert_eq!(report.resolutions[0].duplicate_id, "d2");
    }

    #[test]
    fn test_unreadable_catalog_aborts_before_mutation() {
        let catalog = catalog(vec![asset(
            "a",
            "/photos/misc/a.jpg",
            Some("d1"),
            Visibility::Timeline,
        )])
        .failing_reads();
        let ranker = ranker();

        let err = ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap_err();

        assert!(matches!(err, CullError::CatalogUnavailable(_)));
        assert_eq!(catalog.update_count(), 0);
    }

    #[test]
    fn test_plan_ignores_quality_across_locations() {
        let group = DuplicateGroup {
            duplicate_id: "d1".to_string(),
            assets: vec![
                sized(asset("low", "/photos/misc/low.jpg", Some("d1"), Visibility::Timeline), 1, 1, 1),
                sized(asset("high", "/photos/zzz/high.jpg", Some("d1"), Visibility::Timeline), 999, 99, 99),
            ],
        };
        let GroupDecision::Resolve(plan) = plan_group(&ranker(), &group) else {
            panic!("expected a plan");
        };
        assert_eq!(plan.keeper, "low");
        assert_eq!(plan.archive, vec!["high".to_string()]);
        assert!(plan.restore.is_empty());
    }

    #[test]
    fn test_locked_copy_is_never_picked_or_touched() {
        let body = r#"[{"duplicateId": "d1", "assets": [
            {"id": "secret", "originalPath": "/photos/wedding/s.jpg", "visibility": "locked",
             "exifInfo": {"fileSizeInByte": 900, "exifImageWidth": 90, "exifImageHeight": 90}},
            {"id": "pub", "originalPath": "/photos/wedding/p.jpg", "visibility": "timeline",
             "exifInfo": {"fileSizeInByte": 100, "exifImageWidth": 10, "exifImageHeight": 10}},
            {"id": "old", "originalPath": "/photos/misc/o.jpg", "visibility": "timeline"}
        ]}]"#;
        let groups = crate::catalog::wire::parse_duplicates(body).unwrap();

        let GroupDecision::Resolve(plan) = plan_group(&ranker(), &groups[0]) else {
            panic!("expected a plan");
        };
        assert_eq!(plan.keeper, "pub");
        assert_eq!(plan.archive, vec!["old".to_string()]);
        assert!(plan.restore.is_empty());
    }

    #[test]
    fn test_group_of_locked_and_hidden_members_is_left_alone() {
        let catalog = catalog(vec![
            asset("a", "/photos/wedding/a.jpg", Some("d1"), Visibility::Locked),
            asset("b", "/photos/misc/b.jpg", Some("d1"), Visibility::Hidden),
        ]);
        let ranker = ranker();

        let report = ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        assert_eq!(catalog.update_count(), 0);
        assert_eq!(report.skipped_count, 0);
        assert_eq!(visibility_of(&catalog, "a"), Visibility::Locked);
    }

    #[test]
    fn test_locked_member_in_blessed_location_stays_locked() {
        let catalog = catalog(vec![
            sized(asset("secret", "/photos/wedding/s.jpg", Some("d1"), Visibility::Locked), 900, 90, 90),
            asset("kept", "/photos/misc/k.jpg", Some("d1"), Visibility::Archive),
        ]);
        let ranker = ranker();

        let report = ResolutionEngine::new(&catalog, &ranker).resolve_all().unwrap();

        assert_eq!(visibility_of(&catalog, "secret"), Visibility::Locked);
        assert_eq!(visibility_of(&catalog, "kept"), Visibility::Timeline);
        assert_eq!(report.resolutions[0].blessed_prefix, "/photos/misc");
    }
}
