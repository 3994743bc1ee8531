//! The catalog service seen from the resolution engine.
//!
//! - `immich` - blocking HTTP adapter for the Immich REST API
//! - `memory` - snapshot-backed catalog for offline planning
//! - `dry_run` - wrapper that logs mutations instead of sending them

pub mod dry_run;
pub mod immich;
pub mod memory;
pub(crate) mod wire;

pub use dry_run::DryRunCatalog;
pub use immich::ImmichCatalog;
pub use memory::{CatalogSnapshot, InMemoryCatalog};

use crate::error::CatalogError;
use crate::models::{Asset, DuplicateGroup, Library, LibraryRef, Visibility};

/// Lazily paged asset listing. Each call starts a fresh enumeration.
pub type AssetStream<'a> = Box<dyn Iterator<Item = Result<Asset, CatalogError>> + 'a>;

pub trait Catalog {
    fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, CatalogError>;

    /// Real libraries only; the upload pseudo-library is added by callers that need it.
    fn list_libraries(&self) -> Result<Vec<Library>, CatalogError>;

    fn list_assets(&self, library: &LibraryRef) -> AssetStream<'_>;

    /// Set `visibility` on every asset in `asset_ids` in one call.
    fn update_visibility(
        &self,
        asset_ids: &[String],
        visibility: Visibility,
    ) -> Result<(), CatalogError>;
}

impl<C: Catalog + ?Sized> Catalog for Box<C> {
    fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, CatalogError> {
        (**self).list_duplicate_groups()
    }

    fn list_libraries(&self) -> Result<Vec<Library>, CatalogError> {
        (**self).list_libraries()
    }

    fn list_assets(&self, library: &LibraryRef) -> AssetStream<'_> {
        (**self).list_assets(library)
    }

    fn update_visibility(
        &self,
        asset_ids: &[String],
        visibility: Visibility,
    ) -> Result<(), CatalogError> {
        (**self).update_visibility(asset_ids, visibility)
    }
}

/// Every library plus the upload pseudo-library, which always comes last.
pub fn all_libraries<C: Catalog + ?Sized>(catalog: &C) -> Result<Vec<Library>, CatalogError> {
    let mut libraries = catalog.list_libraries()?;
    libraries.retain(|library| !library.is_upload());
    libraries.push(Library::upload());
    Ok(libraries)
}
