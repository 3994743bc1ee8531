use crate::catalog::Catalog;
use crate::error::CullError;
use crate::models::{Asset, DuplicateGroup};
use std::collections::HashMap;
use tracing::debug;

/// Every duplicate group the catalog knows about, fetched once and read-only after.
///
/// Visibility changes made while resolving do not invalidate it: they never change
/// which assets belong to which group.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    groups: Vec<DuplicateGroup>,
    by_duplicate_id: HashMap<String, usize>,
}

impl DuplicateIndex {
    /// Fetch the duplicate listing. Any failure leaves no index at all.
    pub fn build<C: Catalog + ?Sized>(catalog: &C) -> Result<Self, CullError> {
        let groups = catalog
            .list_duplicate_groups()
            .map_err(CullError::IndexUnavailable)?;
        let index = Self::from_groups(groups);
        debug!("Indexed {} duplicate group(s)", index.len());
        Ok(index)
    }

    pub fn from_groups(groups: Vec<DuplicateGroup>) -> Self {
        let by_duplicate_id = groups
            .iter()
            .enumerate()
            .map(|(i, group)| (group.duplicate_id.clone(), i))
            .collect();
        Self {
            groups,
            by_duplicate_id,
        }
    }

    /// Groups in the order the catalog listed them.
    pub fn all_groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    pub fn get(&self, duplicate_id: &str) -> Option<&DuplicateGroup> {
        self.by_duplicate_id
            .get(duplicate_id)
            .map(|&i| &self.groups[i])
    }

    /// The other copies of `asset`. Empty for unique assets and unknown groups.
    pub fn group_for(&self, asset: &Asset) -> Vec<&Asset> {
        let Some(group) = asset.duplicate_id.as_deref().and_then(|id| self.get(id)) else {
            return Vec::new();
        };
        group
            .assets
            .iter()
            .filter(|member| member.id != asset.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
