//! Search client for the VS Code Marketplace gallery API.

use serde::{Deserialize, Serialize};

use crate::common::{HttpError, HttpSettings, build_client};

pub const MARKETPLACE_URL: &str =
    "https://marketplace.visualstudio.com/_apis/public/gallery/extensionquery";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

const TARGET_VS_CODE: &str = "Microsoft.VisualStudio.Code";
const CATEGORY_THEMES: &str = "Themes";
const FILTER_TARGET: u32 = 8;
const FILTER_CATEGORY: u32 = 5;
const FILTER_SEARCH_TEXT: u32 = 10;
/// Versions, files, statistics and publisher details in one response.
const QUERY_FLAGS: u32 = 914;
const ACCEPT_GALLERY: &str = "application/json;api-version=3.0-preview.1";

const ASSET_VSIX: &str = "Microsoft.VisualStudio.Services.VSIXPackage";
const ASSET_ICON: &str = "Microsoft.VisualStudio.Services.Icons.Default";

/// One theme extension as listed by the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketplaceExtension {
    pub name: String,
    pub publisher: String,
    pub publisher_domain: Option<String>,
    pub domain_verified: bool,
    pub description: String,
    pub downloads: u64,
    pub rating: f32,
    pub icon_url: Option<String>,
    /// The `.vsix` package of the latest version.
    pub download_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Criterion {
    filter_type: u32,
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Filter {
    criteria: Vec<Criterion>,
    page_number: u32,
    page_size: u32,
    sort_by: u32,
    sort_order: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryPayload {
    filters: Vec<Filter>,
    asset_types: Vec<String>,
    flags: u32,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    extensions: Vec<RawExtension>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtension {
    #[serde(default)]
    extension_name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    short_description: Option<String>,
    publisher: RawPublisher,
    #[serde(default)]
    versions: Vec<RawVersion>,
    #[serde(default)]
    statistics: Vec<RawStatistic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPublisher {
    #[serde(default)]
    publisher_name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    is_domain_verified: bool,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    asset_type: String,
    source: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatistic {
    statistic_name: String,
    value: f64,
}

fn query_payload(search: &str, page_number: u32, page_size: u32) -> QueryPayload {
    let mut criteria = vec![
        Criterion {
            filter_type: FILTER_TARGET,
            value: TARGET_VS_CODE.to_string(),
        },
        Criterion {
            filter_type: FILTER_CATEGORY,
            value: CATEGORY_THEMES.to_string(),
        },
    ];
    let search = search.trim();
    if !search.is_empty() {
        criteria.push(Criterion {
            filter_type: FILTER_SEARCH_TEXT,
            value: search.to_string(),
        });
    }
    QueryPayload {
        filters: vec![Filter {
            criteria,
            page_number: page_number.max(1),
            page_size,
            sort_by: 0,
            sort_order: 0,
        }],
        asset_types: Vec::new(),
        flags: QUERY_FLAGS,
    }
}

impl RawExtension {
    fn statistic(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| {
            self.statistics
                .iter()
                .find(|statistic| statistic.statistic_name == *name)
                .map(|statistic| statistic.value)
        })
    }

    fn asset(&self, asset_type: &str) -> Option<String> {
        self.versions
            .first()?
            .files
            .iter()
            .find(|file| file.asset_type == asset_type)
            .map(|file| file.source.clone())
    }

    fn into_extension(self) -> MarketplaceExtension {
        let downloads = self
            .statistic(&["install", "downloadCount"])
            .map_or(0, |value| value.max(0.0) as u64);
        let rating = self.statistic(&["averagerating"]).unwrap_or(0.0) as f32;
        let icon_url = self.asset(ASSET_ICON);
        let download_url = self.asset(ASSET_VSIX);
        MarketplaceExtension {
            name: self
                .display_name
                .filter(|name| !name.is_empty())
                .unwrap_or(self.extension_name),
            publisher: self
                .publisher
                .display_name
                .filter(|name| !name.is_empty())
                .unwrap_or(self.publisher.publisher_name),
            publisher_domain: self.publisher.domain.filter(|domain| !domain.is_empty()),
            domain_verified: self.publisher.is_domain_verified,
            description: self.short_description.unwrap_or_default(),
            downloads,
            rating,
            icon_url,
            download_url,
        }
    }
}

/// Turns a raw `extensionquery` response body into extensions.
pub fn parse_response(body: &str) -> Result<Vec<MarketplaceExtension>, HttpError> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| HttpError::InvalidResponse {
            expected: "extension query result".to_string(),
            actual: e.to_string(),
        })?;
    Ok(response
        .results
        .into_iter()
        .flat_map(|result| result.extensions)
        .map(RawExtension::into_extension)
        .collect())
}

#[derive(Debug, Clone)]
pub struct MarketplaceClient {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl MarketplaceClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, HttpError> {
        Self::with_endpoint(settings, MARKETPLACE_URL)
    }

    /// Client for a gallery mirror or a test server.
    pub fn with_endpoint(settings: &HttpSettings, endpoint: &str) -> Result<Self, HttpError> {
        Ok(Self {
            client: build_client(settings)?,
            endpoint: endpoint.to_string(),
            timeout_secs: settings.timeout_secs,
        })
    }

    /// Searches theme extensions. `page_number` starts at 1.
    pub async fn search(
        &self,
        query: &str,
        page_number: u32,
        page_size: u32,
    ) -> Result<Vec<MarketplaceExtension>, HttpError> {
        let url = self.endpoint.as_str();
        log::debug!("Marketplace search '{query}' page {page_number}");

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, ACCEPT_GALLERY)
            .json(&query_payload(query, page_number, page_size))
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(url, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| HttpError::from_reqwest(url, self.timeout_secs, e))?;
        let extensions = parse_response(&body)?;
        log::info!("Marketplace returned {} themes for '{query}'", extensions.len());
        Ok(extensions)
    }
}
