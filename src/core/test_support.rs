// Fixtures shared by the unit tests.

use crate::catalog::{AssetStream, Catalog, InMemoryCatalog};
use crate::error::CatalogError;
use crate::models::{Asset, DuplicateGroup, Library, LibraryRef, Quality, Visibility};
use std::cell::RefCell;
use std::collections::HashSet;

pub fn asset(id: &str, path: &str, duplicate_id: Option<&str>, visibility: Visibility) -> Asset {
    Asset {
        id: id.to_string(),
        original_path: path.to_string(),
        library_id: None,
        visibility,
        duplicate_id: duplicate_id.map(str::to_string),
        quality: Quality::default(),
    }
}

pub fn sized(mut asset: Asset, size: u64, width: u32, height: u32) -> Asset {
    asset.quality = Quality {
        size,
        width,
        height,
    };
    asset
}

pub fn in_library(mut asset: Asset, library_id: &str) -> Asset {
    asset.library_id = Some(library_id.to_string());
    asset
}

pub fn library(id: &str, name: &str) -> Library {
    Library {
        id: id.to_string(),
        name: name.to_string(),
        import_paths: Vec::new(),
        exclusion_patterns: Vec::new(),
    }
}

/// In-memory catalog that records every update call and fails on request.
pub struct FlakyCatalog {
    pub inner: InMemoryCatalog,
    fail_reads: bool,
    fail_upload_listing: bool,
    fail_updates_touching: HashSet<String>,
    pub updates: RefCell<Vec<(Vec<String>, Visibility)>>,
}

impl FlakyCatalog {
    pub fn new(inner: InMemoryCatalog) -> Self {
        Self {
            inner,
            fail_reads: false,
            fail_upload_listing: false,
            fail_updates_touching: HashSet::new(),
            updates: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Refuse to enumerate the upload pseudo-library, like a server with no device id.
    pub fn failing_upload_listing(mut self) -> Self {
        self.fail_upload_listing = true;
        self
    }

    /// Reject any update batch that contains `asset_id`.
    pub fn failing_updates_for(mut self, asset_id: &str) -> Self {
        self.fail_updates_touching.insert(asset_id.to_string());
        self
    }

    pub fn update_count(&self) -> usize {
        self.updates.borrow().len()
    }

    pub fn reset_updates(&self) {
        self.updates.borrow_mut().clear();
    }

    fn unavailable() -> CatalogError {
        CatalogError::Status {
            status: 503,
            path: "/test".to_string(),
            body: "unavailable".to_string(),
        }
    }
}

impl Catalog for FlakyCatalog {
    fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, CatalogError> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        self.inner.list_duplicate_groups()
    }

    fn list_libraries(&self) -> Result<Vec<Library>, CatalogError> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        self.inner.list_libraries()
    }

    fn list_assets(&self, library: &LibraryRef) -> AssetStream<'_> {
        if self.fail_reads {
            return Box::new(std::iter::once(Err::<Asset, _>(Self::unavailable())));
        }
        if self.fail_upload_listing && *library == LibraryRef::Upload {
            return Box::new(std::iter::once(Err::<Asset, _>(CatalogError::NotConfigured(
                "no upload device".to_string(),
            ))));
        }
        self.inner.list_assets(library)
    }

    fn update_visibility(
        &self,
        asset_ids: &[String],
        visibility: Visibility,
    ) -> Result<(), CatalogError> {
        self.updates
            .borrow_mut()
            .push((asset_ids.to_vec(), visibility));
        if asset_ids
            .iter()
            .any(|id| self.fail_updates_touching.contains(id))
        {
            return Err(Self::unavailable());
        }
        self.inner.update_visibility(asset_ids, visibility)
    }
}
