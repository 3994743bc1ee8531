use super::{AssetStream, Catalog};
use crate::error::CatalogError;
use crate::models::{DuplicateGroup, Library, LibraryRef, Visibility};
use std::cell::Cell;
use tracing::info;

/// Reads go to the wrapped catalog; mutations are only logged.
pub struct DryRunCatalog<C> {
    inner: C,
    skipped_updates: Cell<usize>,
}

impl<C: Catalog> DryRunCatalog<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            skipped_updates: Cell::new(0),
        }
    }

    /// Number of update calls that were swallowed.
    pub fn skipped_updates(&self) -> usize {
        self.skipped_updates.get()
    }
}

impl<C: Catalog> Catalog for DryRunCatalog<C> {
    fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, CatalogError> {
        self.inner.list_duplicate_groups()
    }

    fn list_libraries(&self) -> Result<Vec<Library>, CatalogError> {
        self.inner.list_libraries()
    }

    fn list_assets(&self, library: &LibraryRef) -> AssetStream<'_> {
        self.inner.list_assets(library)
    }

    fn update_visibility(
        &self,
        asset_ids: &[String],
        visibility: Visibility,
    ) -> Result<(), CatalogError> {
        info!(
            "[dry-run] would set visibility={} on {:?}",
            visibility, asset_ids
        );
        self.skipped_updates.set(self.skipped_updates.get() + 1);
        Ok(())
    }
}
