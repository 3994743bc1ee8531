use super::wire::{
    SearchRequest, VisibilityUpdate, WireAsset, WireLibrary, WireSearchResponse, parse_duplicates,
};
use super::{AssetStream, Catalog};
use crate::error::CatalogError;
use crate::models::{Asset, DuplicateGroup, Library, LibraryRef, Visibility};
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-api-key";
const DEFAULT_PAGE_SIZE: u64 = 250;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Immich REST API, called synchronously.
pub struct ImmichCatalog {
    client: Client,
    base_url: String,
    upload_device_id: Option<String>,
    duplicates_file: Option<PathBuf>,
    page_size: u64,
}

impl ImmichCatalog {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, CatalogError> {
        if api_key.is_empty() {
            return Err(CatalogError::NotConfigured("missing API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| CatalogError::NotConfigured(format!("invalid API key: {}", e)))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_device_id: None,
            duplicates_file: None,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Device id that owns library-less uploads; required to enumerate them.
    pub fn with_upload_device_id(mut self, device_id: Option<String>) -> Self {
        self.upload_device_id = device_id;
        self
    }

    /// Read the duplicate listing from a saved `/duplicates` response instead.
    pub fn with_duplicates_file(mut self, path: Option<PathBuf>) -> Self {
        self.duplicates_file = path;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(response: Response, path: &str) -> Result<Response, CatalogError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(CatalogError::Status {
            status: status.as_u16(),
            path: path.to_string(),
            body,
        })
    }

    fn get_text(&self, path: &str) -> Result<String, CatalogError> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send()?;
        Ok(Self::check(response, path)?.text()?)
    }

    fn search_page(&self, request: &SearchRequest<'_>) -> Result<WireSearchResponse, CatalogError> {
        let path = "/search/metadata";
        debug!("POST {} page {}", path, request.page);
        let response = self.client.post(self.url(path)).json(request).send()?;
        Ok(Self::check(response, path)?.json()?)
    }
}

impl Catalog for ImmichCatalog {
    fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, CatalogError> {
        let body = match &self.duplicates_file {
            Some(path) => {
                debug!("Reading duplicate listing from {}", path.display());
                fs::read_to_string(path)?
            }
            None => self.get_text("/duplicates")?,
        };
        parse_duplicates(&body)
    }

    fn list_libraries(&self) -> Result<Vec<Library>, CatalogError> {
        let body = self.get_text("/libraries")?;
        let libraries: Vec<WireLibrary> = serde_json::from_str(&body)?;
        Ok(libraries.into_iter().map(Library::from).collect())
    }

    fn list_assets(&self, library: &LibraryRef) -> AssetStream<'_> {
        let filter = match library {
            LibraryRef::Library(id) => SearchFilter::Library(id.clone()),
            LibraryRef::Upload => match &self.upload_device_id {
                Some(device_id) => SearchFilter::Device(device_id.clone()),
                None => {
                    return Box::new(std::iter::once(Err::<Asset, _>(
                        CatalogError::NotConfigured(
                            "upload_device_id is required to list uploaded assets".to_string(),
                        ),
                    )));
                }
            },
        };
        Box::new(AssetPages {
            catalog: self,
            filter,
            next_page: Some(1),
            buffer: VecDeque::new(),
        })
    }

    fn update_visibility(
        &self,
        asset_ids: &[String],
        visibility: Visibility,
    ) -> Result<(), CatalogError> {
        let path = "/assets";
        debug!("PUT {} visibility={} ids={}", path, visibility, asset_ids.len());
        let body = VisibilityUpdate {
            ids: asset_ids,
            visibility,
        };
        let response = self.client.put(self.url(path)).json(&body).send()?;
        Self::check(response, path)?;
        Ok(())
    }
}

enum SearchFilter {
    Library(String),
    Device(String),
}

/// Walks `/search/metadata` one page at a time.
struct AssetPages<'a> {
    catalog: &'a ImmichCatalog,
    filter: SearchFilter,
    next_page: Option<u64>,
    buffer: VecDeque<WireAsset>,
}

impl AssetPages<'_> {
    fn fetch(&mut self, page: u64) -> Result<(), CatalogError> {
        let (library_id, device_id) = match &self.filter {
            SearchFilter::Library(id) => (Some(id.as_str()), None),
            SearchFilter::Device(id) => (None, Some(id.as_str())),
        };
        let request = SearchRequest {
            library_id,
            device_id,
            page,
            size: self.catalog.page_size,
            with_exif: true,
        };
        let response = self.catalog.search_page(&request)?;
        self.next_page = response
            .assets
            .next_page
            .and_then(|next| next.page())
            .filter(|&next| next > page);
        self.buffer.extend(response.assets.items);
        Ok(())
    }
}

impl Iterator for AssetPages<'_> {
    type Item = Result<Asset, CatalogError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.is_empty() {
            let page = self.next_page.take()?;
            if let Err(err) = self.fetch(page) {
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Asset::try_from)
    }
}
