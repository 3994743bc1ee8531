use super::{AssetStream, Catalog};
use crate::error::CatalogError;
use crate::models::{Asset, DuplicateGroup, Library, LibraryRef, Visibility};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// On-disk form of an in-memory catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl CatalogSnapshot {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Catalog held entirely in memory. Duplicate groups are derived from the assets'
/// `duplicate_id`, so mutations are visible to the next listing.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    libraries: Vec<Library>,
    assets: RefCell<Vec<Asset>>,
}

impl InMemoryCatalog {
    pub fn new(libraries: Vec<Library>, assets: Vec<Asset>) -> Self {
        Self {
            libraries,
            assets: RefCell::new(assets),
        }
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self::new(snapshot.libraries, snapshot.assets)
    }

    pub fn asset(&self, id: &str) -> Option<Asset> {
        self.assets.borrow().iter().find(|a| a.id == id).cloned()
    }

    pub fn assets(&self) -> Vec<Asset> {
        self.assets.borrow().clone()
    }
}

impl Catalog for InMemoryCatalog {
    fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, CatalogError> {
        let mut groups: Vec<DuplicateGroup> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for asset in self.assets.borrow().iter() {
            let Some(duplicate_id) = &asset.duplicate_id else {
                continue;
            };
            let i = *positions.entry(duplicate_id.clone()).or_insert_with(|| {
                groups.push(DuplicateGroup {
                    duplicate_id: duplicate_id.clone(),
                    assets: Vec::new(),
                });
                groups.len() - 1
            });
            groups[i].assets.push(asset.clone());
        }

        Ok(groups)
    }

    fn list_libraries(&self) -> Result<Vec<Library>, CatalogError> {
        Ok(self.libraries.clone())
    }

    fn list_assets(&self, library: &LibraryRef) -> AssetStream<'_> {
        let matching: Vec<Asset> = self
            .assets
            .borrow()
            .iter()
            .filter(|asset| asset.library_ref() == *library)
            .cloned()
            .collect();
        Box::new(matching.into_iter().map(Ok::<Asset, CatalogError>))
    }

    fn update_visibility(
        &self,
        asset_ids: &[String],
        visibility: Visibility,
    ) -> Result<(), CatalogError> {
        for asset in self.assets.borrow_mut().iter_mut() {
            if asset_ids.contains(&asset.id) {
                asset.visibility = visibility;
            }
        }
        Ok(())
    }
}
