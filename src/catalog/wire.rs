// Immich JSON payloads and their conversion into the typed model.

use crate::error::CatalogError;
use crate::models::{Asset, DuplicateGroup, Library, Quality, Visibility};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireExif {
    #[serde(default, alias = "fileSizeInbyte")]
    file_size_in_byte: Option<f64>,
    #[serde(default)]
    exif_image_width: Option<f64>,
    #[serde(default)]
    exif_image_height: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAsset {
    id: String,
    original_path: String,
    #[serde(default)]
    library_id: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    is_archived: Option<bool>,
    #[serde(default)]
    duplicate_id: Option<String>,
    #[serde(default)]
    exif_info: Option<WireExif>,
}

impl TryFrom<WireAsset> for Asset {
    type Error = CatalogError;

    fn try_from(wire: WireAsset) -> Result<Self, Self::Error> {
        if wire.id.is_empty() {
            return Err(CatalogError::Malformed("asset without id".to_string()));
        }

        // Unrecognised states are treated like `hidden` so they are never touched.
        let visibility = match (wire.visibility.as_deref(), wire.is_archived) {
            (Some("timeline"), _) => Visibility::Timeline,
            (Some("archive"), _) => Visibility::Archive,
            (Some("locked"), _) => Visibility::Locked,
            (Some(_), _) => Visibility::Hidden,
            (None, Some(true)) => Visibility::Archive,
            (None, _) => Visibility::Timeline,
        };

        let quality = wire
            .exif_info
            .map(|exif| Quality {
                size: exif.file_size_in_byte.map(|v| v.max(0.0) as u64).unwrap_or(0),
                width: exif.exif_image_width.map(|v| v.max(0.0) as u32).unwrap_or(0),
                height: exif.exif_image_height.map(|v| v.max(0.0) as u32).unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(Asset {
            id: wire.id,
            original_path: wire.original_path,
            library_id: wire.library_id.filter(|id| !id.is_empty()),
            visibility,
            duplicate_id: wire.duplicate_id.filter(|id| !id.is_empty()),
            quality,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDuplicateGroup {
    duplicate_id: String,
    #[serde(default)]
    assets: Vec<WireAsset>,
}

impl TryFrom<WireDuplicateGroup> for DuplicateGroup {
    type Error = CatalogError;

    fn try_from(wire: WireDuplicateGroup) -> Result<Self, Self::Error> {
        let assets = wire
            .assets
            .into_iter()
            .map(Asset::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if assets.is_empty() {
            return Err(CatalogError::Malformed(format!(
                "duplicate group {} has no assets",
                wire.duplicate_id
            )));
        }
        Ok(DuplicateGroup {
            duplicate_id: wire.duplicate_id,
            assets,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireLibrary {
    id: String,
    name: String,
    #[serde(default)]
    import_paths: Vec<String>,
    #[serde(default)]
    exclusion_patterns: Vec<String>,
}

impl From<WireLibrary> for Library {
    fn from(wire: WireLibrary) -> Self {
        Library {
            id: wire.id,
            name: wire.name,
            import_paths: wire.import_paths,
            exclusion_patterns: wire.exclusion_patterns,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NextPage {
    Text(String),
    Number(u64),
}

impl NextPage {
    pub(crate) fn page(&self) -> Option<u64> {
        match self {
            NextPage::Text(text) => text.parse().ok(),
            NextPage::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAssetPage {
    #[serde(default)]
    pub(crate) items: Vec<WireAsset>,
    #[serde(default)]
    pub(crate) next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSearchResponse {
    pub(crate) assets: WireAssetPage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) library_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) device_id: Option<&'a str>,
    pub(crate) page: u64,
    pub(crate) size: u64,
    pub(crate) with_exif: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct VisibilityUpdate<'a> {
    pub(crate) ids: &'a [String],
    pub(crate) visibility: Visibility,
}

/// Parse a `/duplicates` response body.
pub(crate) fn parse_duplicates(body: &str) -> Result<Vec<DuplicateGroup>, CatalogError> {
    let groups: Vec<WireDuplicateGroup> = serde_json::from_str(body)?;
    groups.into_iter().map(DuplicateGroup::try_from).collect()
}
