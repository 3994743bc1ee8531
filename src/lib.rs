pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod models;

pub use catalog::{Catalog, DryRunCatalog, ImmichCatalog, InMemoryCatalog};
pub use config::Config;
pub use error::{CatalogError, CullError};
pub use models::{Asset, DuplicateGroup, Library, LibraryRef, Quality, Visibility};
