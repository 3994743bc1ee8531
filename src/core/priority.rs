use crate::models::Asset;
use std::collections::HashMap;

/// Ranks storage locations by the operator's trust order.
///
/// A location is identified by the first two components of an asset path
/// (`/photos/wedding/2019/a.jpg` ranks as `/photos/wedding`). Earlier entries win.
#[derive(Debug, Clone, Default)]
pub struct PriorityRanker {
    prefixes: Vec<String>,
    ranks: HashMap<String, usize>,
}

impl PriorityRanker {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranker = Self::default();
        for prefix in prefixes {
            let prefix = prefix.into();
            if ranker.ranks.contains_key(&prefix) {
                continue;
            }
            ranker.ranks.insert(prefix.clone(), ranker.prefixes.len());
            ranker.prefixes.push(prefix);
        }
        ranker
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// First three `/`-separated segments rejoined. Leading-slash paths keep the slash.
    pub fn prefix_of(path: &str) -> String {
        path.split('/').take(3).collect::<Vec<_>>().join("/")
    }

    pub fn rank_of(&self, path: &str) -> Option<usize> {
        self.ranks.get(&Self::prefix_of(path)).copied()
    }

    /// The highest-priority listed prefix that at least one member is stored under.
    pub fn blessed_prefix<'a, I>(&'a self, members: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a Asset>,
    {
        members
            .into_iter()
            .filter_map(|asset| self.rank_of(&asset.original_path))
            .min()
            .map(|rank| self.prefixes[rank].as_str())
    }
}
