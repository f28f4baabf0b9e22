//! CKAN datastore data loader
//!
//! Fetches records from a CKAN `datastore_search` endpoint (datos.gob.cl by
//! default) using `limit`/`offset` pagination. Also usable against any JSON
//! API that returns a list of objects, by pointing `records_path` at the list
//! and disabling pagination.

use async_trait::async_trait;
use delistat_core::error::{DelistatError, Result};
use delistat_core::provider::{RecordSource, RecordStream};
use delistat_core::types::{Record, Table, Value};
use futures::stream::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

/// datastore_search endpoint on datos.gob.cl
pub const DEFAULT_BASE_URL: &str = "https://datos.gob.cl/api/3/action/datastore_search";

/// Police crime statistics resource on datos.gob.cl
pub const DEFAULT_RESOURCE_ID: &str = "18b1d53d-7e52-4a1e-bf8e-55b206389757";

/// Where CKAN puts the record list inside the response
pub const DEFAULT_RECORDS_PATH: &str = "result.records";

/// Records requested per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for the API source
#[derive(Debug, Clone)]
pub struct CkanConfig {
    /// Endpoint URL (may already carry query parameters)
    pub base_url: String,
    /// CKAN resource id, sent as `resource_id`
    pub resource_id: Option<String>,
    /// Dotted path to the record list; `None` picks the first array found
    pub records_path: Option<String>,
    /// Records per request
    pub page_size: usize,
    /// Stop after this many records
    pub max_records: Option<usize>,
    /// Use `limit`/`offset` pagination; otherwise issue a single GET
    pub paginate: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Additional query parameters
    pub params: Vec<(String, String)>,
}

impl Default for CkanConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resource_id: Some(DEFAULT_RESOURCE_ID.to_string()),
            records_path: Some(DEFAULT_RECORDS_PATH.to_string()),
            page_size: DEFAULT_PAGE_SIZE,
            max_records: None,
            paginate: true,
            timeout: DEFAULT_TIMEOUT,
            params: Vec::new(),
        }
    }
}

impl CkanConfig {
    /// Default configuration pointed at another endpoint
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set or clear the resource id
    pub fn with_resource_id(mut self, id: Option<String>) -> Self {
        self.resource_id = id;
        self
    }

    /// Set or clear the records path
    pub fn with_records_path(mut self, path: Option<String>) -> Self {
        self.records_path = path;
        self
    }

    /// Set the page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Cap the number of records fetched
    pub fn with_max_records(mut self, max: Option<usize>) -> Self {
        self.max_records = max;
        self
    }

    /// Enable or disable pagination
    pub fn with_pagination(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add an extra query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

/// One decoded API response
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records on this page
    pub records: Vec<Record>,
    /// Column order announced by CKAN (`result.fields`)
    pub fields: Vec<String>,
    /// Total number of matching records, when the API reports it
    pub total: Option<usize>,
}

impl Page {
    /// Decode a JSON document into a page
    pub fn from_json(json: &serde_json::Value, records_path: Option<&str>) -> Result<Self> {
        check_ckan_success(json)?;
        Ok(Self {
            records: extract_records(json, records_path)?,
            fields: extract_field_order(json),
            total: extract_total(json),
        })
    }
}

/// Offset bookkeeping for one paginated download
#[derive(Debug, Clone)]
struct Pagination {
    page_size: usize,
    max_records: Option<usize>,
    total: Option<usize>,
    fetched: usize,
    done: bool,
}

impl Pagination {
    fn new(page_size: usize, max_records: Option<usize>) -> Self {
        Self {
            page_size,
            max_records,
            total: None,
            fetched: 0,
            done: max_records == Some(0),
        }
    }

    /// Offset of the next request
    fn offset(&self) -> usize {
        self.fetched
    }

    /// Limit for the next request, never above what `max_records` still allows
    fn limit(&self) -> usize {
        match self.max_records {
            Some(max) => self.page_size.min(max.saturating_sub(self.fetched)),
            None => self.page_size,
        }
    }

    /// Account for a received page and return how many of its records to keep
    fn accept(&mut self, received: usize, requested: usize, total: Option<usize>) -> usize {
        if total.is_some() {
            self.total = total;
        }

        let mut keep = received;
        if let Some(max) = self.max_records {
            keep = keep.min(max.saturating_sub(self.fetched));
        }
        self.fetched += keep;

        if received == 0 || received < requested {
            self.done = true;
        }
        if received > requested {
            warn!(
                "API returned {} records for limit {}; assuming it ignores pagination",
                received, requested
            );
            self.done = true;
        }
        if let Some(total) = self.total {
            if self.fetched >= total {
                self.done = true;
            }
        }
        if let Some(max) = self.max_records {
            if self.fetched >= max {
                self.done = true;
            }
        }

        keep
    }
}

/// Data loader for CKAN / REST record APIs.
pub struct DataLoader {
    config: CkanConfig,
    base_url: Url,
    client: reqwest::Client,
    show_progress: bool,
}

impl DataLoader {
    /// Create a loader, validating the configuration
    pub fn new(config: CkanConfig) -> Result<Self> {
        if config.page_size == 0 {
            return Err(DelistatError::Config(
                "page size must be greater than zero".into(),
            ));
        }
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DelistatError::Config(format!("Invalid API URL '{}': {e}", config.base_url))
        })?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            base_url,
            client,
            show_progress: false,
        })
    }

    /// Show a progress bar while downloading pages
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// The active configuration
    pub fn config(&self) -> &CkanConfig {
        &self.config
    }

    /// Build the request URL for one page
    pub fn page_url(&self, offset: usize, limit: usize) -> Url {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if let Some(resource_id) = &self.config.resource_id {
            pairs.push(("resource_id".to_string(), resource_id.clone()));
        }
        pairs.extend(self.config.params.iter().cloned());
        if self.config.paginate {
            pairs.push(("limit".to_string(), limit.to_string()));
            pairs.push(("offset".to_string(), offset.to_string()));
        }

        let mut url = self.base_url.clone();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        url
    }

    fn progress_bar(total: Option<usize>) -> ProgressBar {
        match total {
            Some(total) => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} records")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner} {msg} {pos} records")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb
            }
        }
    }

    /// Stream decoded pages until pagination says stop
    pub fn load_pages(&self) -> Pin<Box<dyn Stream<Item = Result<Page>> + Send + '_>> {
        Box::pin(async_stream::try_stream! {
            let records_path = self.config.records_path.as_deref();

            if !self.config.paginate {
                let url = self.page_url(0, 0);
                let json = fetch_json(&self.client, url).await?;
                let mut page = Page::from_json(&json, records_path)?;
                if let Some(max) = self.config.max_records {
                    page.records.truncate(max);
                }
                info!("Fetched {} records in a single request", page.records.len());
                yield page;
            } else {
                let mut pagination = Pagination::new(self.config.page_size, self.config.max_records);
                let mut progress: Option<ProgressBar> = None;

                while !pagination.done {
                    let offset = pagination.offset();
                    let limit = pagination.limit();
                    let url = self.page_url(offset, limit);
                    let json = fetch_json(&self.client, url).await?;
                    let mut page = Page::from_json(&json, records_path)?;

                    let keep = pagination.accept(page.records.len(), limit, page.total);
                    page.records.truncate(keep);
                    debug!(
                        "Page at offset {} returned {} records (total so far {})",
                        offset,
                        page.records.len(),
                        pagination.fetched
                    );

                    if self.show_progress {
                        let pb = progress.get_or_insert_with(|| {
                            let total = match (page.total, self.config.max_records) {
                                (Some(total), Some(max)) => Some(total.min(max)),
                                (total, max) => total.or(max),
                            };
                            let pb = Self::progress_bar(total);
                            pb.set_message("Downloading");
                            pb
                        });
                        pb.set_position(pagination.fetched as u64);
                    }

                    yield page;
                }

                if let Some(pb) = progress {
                    pb.finish_with_message("Download complete");
                }
                info!("Fetched {} records from {}", pagination.fetched, self.base_url);
            }
        })
    }
}

#[async_trait]
impl RecordSource for DataLoader {
    fn label(&self) -> String {
        match &self.config.resource_id {
            Some(id) => format!("{} (resource {})", self.base_url, id),
            None => self.base_url.to_string(),
        }
    }

    fn load_records(&self) -> RecordStream<'_> {
        Box::pin(async_stream::try_stream! {
            let mut pages = self.load_pages();
            while let Some(page) = pages.next().await {
                for record in page?.records {
                    yield record;
                }
            }
        })
    }

    async fn load_table(&self) -> Result<Table> {
        let mut pages = self.load_pages();
        let mut fields: Vec<String> = Vec::new();
        let mut records = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page?;
            if fields.is_empty() {
                fields = page.fields;
            }
            records.extend(page.records);
        }
        Ok(Table::from_records_with_order(&fields, records))
    }
}

/// GET a URL and decode the body as JSON; non-2xx statuses are errors
pub async fn fetch_json(client: &reqwest::Client, url: Url) -> Result<serde_json::Value> {
    debug!("GET {}", url);
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?
        .error_for_status()?;
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// CKAN reports failures in-band as `{"success": false, "error": {...}}`
fn check_ckan_success(json: &serde_json::Value) -> Result<()> {
    if json.get("success").and_then(|s| s.as_bool()) != Some(false) {
        return Ok(());
    }
    let message = match json.get("error") {
        Some(error) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        None => "unknown error".to_string(),
    };
    Err(DelistatError::UnexpectedResponse(format!(
        "API reported failure: {message}"
    )))
}

/// Pull the record list out of a JSON document
///
/// With a dotted `path` (`result.records`) each segment is followed; a
/// missing segment yields no records. Without a path, a top-level array is
/// used as-is and an object contributes its first array value.
pub fn extract_records(json: &serde_json::Value, path: Option<&str>) -> Result<Vec<Record>> {
    let target = match path.filter(|p| !p.is_empty()) {
        Some(path) => {
            let mut current = Some(json);
            for key in path.split('.') {
                current = current.and_then(|value| value.get(key));
            }
            current
        }
        None => match json {
            serde_json::Value::Array(_) => Some(json),
            serde_json::Value::Object(map) => map.values().find(|v| v.is_array()),
            _ => None,
        },
    };

    match target {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => Ok(items.iter().map(record_from_item).collect()),
        Some(serde_json::Value::Object(map)) => Ok(vec![Record::from_json_object(map)]),
        Some(other) => Err(DelistatError::UnexpectedResponse(format!(
            "expected a list of records, found {other}"
        ))),
    }
}

fn record_from_item(item: &serde_json::Value) -> Record {
    match item {
        serde_json::Value::Object(map) => Record::from_json_object(map),
        other => Record::new().with("value", Value::from_json(other)),
    }
}

/// Column order from `result.fields[].id`
pub fn extract_field_order(json: &serde_json::Value) -> Vec<String> {
    json.pointer("/result/fields")
        .and_then(|fields| fields.as_array())
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.get("id").and_then(|id| id.as_str()).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Total number of matching records from `result.total`
pub fn extract_total(json: &serde_json::Value) -> Option<usize> {
    json.pointer("/result/total")
        .and_then(|t| t.as_u64())
        .map(|t| t as usize)
}
