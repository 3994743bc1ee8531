use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed id of the synthetic library that holds uploaded (library-less) assets.
pub const UPLOAD_LIBRARY_ID: &str = "upload";
pub const UPLOAD_LIBRARY_NAME: &str = "upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible on the timeline; the canonical copy.
    Timeline,
    /// Hidden from the timeline.
    Archive,
    /// Hidden by the server itself (e.g. live-photo motion parts). Never changed here.
    Hidden,
    /// In the locked folder. Never changed here.
    Locked,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Timeline => "timeline",
            Visibility::Archive => "archive",
            Visibility::Hidden => "hidden",
            Visibility::Locked => "locked",
        }
    }

    /// Whether deduplication may move an asset between timeline and archive.
    pub fn is_managed(&self) -> bool {
        matches!(self, Visibility::Timeline | Visibility::Archive)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Technical attributes used to rank copies of the same photo. Unknown values are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality {
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Quality {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub original_path: String,
    #[serde(default)]
    pub library_id: Option<String>,
    pub visibility: Visibility,
    #[serde(default)]
    pub duplicate_id: Option<String>,
    #[serde(default)]
    pub quality: Quality,
}

impl Asset {
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Timeline
    }

    pub fn is_managed(&self) -> bool {
        self.visibility.is_managed()
    }

    /// The library this asset is stored in; assets without a library live in upload.
    pub fn library_ref(&self) -> LibraryRef {
        match &self.library_id {
            Some(id) => LibraryRef::Library(id.clone()),
            None => LibraryRef::Upload,
        }
    }
}

/// A set of assets the catalog's detector judged to be the same photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub duplicate_id: String,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub import_paths: Vec<String>,
    #[serde(default)]
    pub exclusion_patterns: Vec<String>,
}

impl Library {
    pub fn upload() -> Self {
        Self {
            id: UPLOAD_LIBRARY_ID.to_string(),
            name: UPLOAD_LIBRARY_NAME.to_string(),
            import_paths: Vec::new(),
            exclusion_patterns: Vec::new(),
        }
    }

    pub fn is_upload(&self) -> bool {
        self.id == UPLOAD_LIBRARY_ID
    }

    pub fn library_ref(&self) -> LibraryRef {
        if self.is_upload() {
            LibraryRef::Upload
        } else {
            LibraryRef::Library(self.id.clone())
        }
    }
}

/// Argument to asset enumeration: a real library or the upload pseudo-location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibraryRef {
    Upload,
    Library(String),
}

impl fmt::Display for LibraryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryRef::Upload => f.write_str(UPLOAD_LIBRARY_ID),
            LibraryRef::Library(id) => f.write_str(id),
        }
    }
}
