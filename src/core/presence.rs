use crate::catalog::{Catalog, all_libraries};
use crate::core::index::DuplicateIndex;
use crate::error::CullError;
use crate::models::{Asset, Library, LibraryRef};
use serde::Serialize;
use tracing::debug;

/// An asset stored nowhere else, with the name of the library holding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleStored {
    pub library: String,
    pub asset: Asset,
}

/// Read-only questions about where copies of an asset live.
pub struct PresenceClassifier<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    index: &'a DuplicateIndex,
}

impl<'a, C: Catalog + ?Sized> PresenceClassifier<'a, C> {
    pub fn new(catalog: &'a C, index: &'a DuplicateIndex) -> Self {
        Self { catalog, index }
    }

    fn libraries(&self) -> Result<Vec<Library>, CullError> {
        all_libraries(self.catalog).map_err(CullError::CatalogUnavailable)
    }

    fn assets_in(&self, library: &Library) -> Result<Vec<Asset>, CullError> {
        let assets = self
            .catalog
            .list_assets(&library.library_ref())
            .collect::<Result<Vec<_>, _>>()
            .map_err(CullError::CatalogUnavailable)?;
        debug!("Library {} holds {} asset(s)", library.name, assets.len());
        Ok(assets)
    }

    /// Every asset the duplicate detector found no sibling for, in any library.
    pub fn find_single_stored(&self) -> Result<Vec<SingleStored>, CullError> {
        let mut found = Vec::new();
        for library in self.libraries()? {
            for asset in self.assets_in(&library)? {
                if asset.duplicate_id.is_none() {
                    found.push(SingleStored {
                        library: library.name.clone(),
                        asset,
                    });
                }
            }
        }
        Ok(found)
    }

    /// Assets in other libraries with no copy in `target`.
    pub fn find_not_in_library(&self, target: &LibraryRef) -> Result<Vec<Asset>, CullError> {
        let libraries = self.libraries()?;
        if !libraries.iter().any(|library| library.library_ref() == *target) {
            return Err(CullError::UnknownLibrary(target.to_string()));
        }

        let mut found = Vec::new();
        for library in libraries.iter().filter(|l| l.library_ref() != *target) {
            for asset in self.assets_in(library)? {
                let reaches_target = asset.duplicate_id.is_some()
                    && self
                        .index
                        .group_for(&asset)
                        .iter()
                        .any(|sibling| sibling.library_ref() == *target);
                if !reaches_target {
                    found.push(asset);
                }
            }
        }
        Ok(found)
    }
}
