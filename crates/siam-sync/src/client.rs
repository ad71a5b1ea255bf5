//! # Remote Catalog Client
//!
//! Firestore REST client for the `products` and `movements` collections.
//!
//! ## Request Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base = {endpoint}/projects/{project}/databases/{db}/documents          │
//! │                                                                         │
//! │  probe            GET    base/products?pageSize=1                       │
//! │  get_by_code      GET    base/products/{code}          404 → None       │
//! │  list_all         GET    base/products?pageSize=N&pageToken=..  (loop)  │
//! │  create           POST   base/products?documentId={code}  409 → ok      │
//! │  update_quantity  PATCH  base/products/{code}                           │
//! │                          ?updateMask.fieldPaths=quantity                │
//! │                          &currentDocument.exists=true                   │
//! │  record_movement  POST   base/movements?documentId={uuid} 409 → ok      │
//! │  delete           DELETE base/products/{code}          404 → ok         │
//! │                                                                         │
//! │  Every request carries ?key={api_key} and a timeout.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let client = FirestoreClient::new(config.remote.clone())?;
//! if client.connect() {
//!     let toner = client.get_by_code("7591002200046").await?;
//! }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::codec::{self, Document, ListDocumentsResponse, WireValue};
use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};
use siam_core::{Movement, Product, MOVEMENTS_COLLECTION, PRODUCTS_COLLECTION};

// =============================================================================
// Remote Catalog Trait
// =============================================================================

/// The remote half of the repository.
///
/// `FirestoreClient` is the production implementation; tests substitute an
/// in-process fake.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Checks the credentials and marks the client usable. No network I/O.
    fn connect(&self) -> bool;

    /// Whether `connect()` accepted the credentials.
    fn is_connected(&self) -> bool;

    /// Confirms the remote store answers.
    async fn probe(&self) -> SyncResult<()>;

    /// Fetches one product. `Ok(None)` when it does not exist.
    async fn get_by_code(&self, code: &str) -> SyncResult<Option<Product>>;

    /// Fetches the whole catalog, skipping undecodable documents.
    async fn list_all(&self) -> SyncResult<Vec<Product>>;

    /// Creates a product document keyed by code. An existing document is
    /// left untouched and counts as success.
    async fn create(&self, product: &Product) -> SyncResult<()>;

    /// Overwrites only the quantity of an existing product.
    async fn update_quantity(&self, code: &str, quantity: i64) -> SyncResult<()>;

    /// Records a movement keyed by its id. Recording twice is a no-op.
    async fn record_movement(&self, movement: &Movement) -> SyncResult<()>;

    /// Deletes a product document. A missing document counts as success.
    async fn delete(&self, code: &str) -> SyncResult<()>;
}

// =============================================================================
// Firestore Client
// =============================================================================

/// Firestore REST implementation of [`RemoteCatalog`].
#[derive(Debug)]
pub struct FirestoreClient {
    http: reqwest::Client,
    settings: RemoteSettings,
    connected: AtomicBool,
}

/// Firestore error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if envelope.error.status.is_empty() => envelope.error.message,
        Ok(envelope) => format!("{}: {}", envelope.error.status, envelope.error.message),
        Err(_) => body.chars().take(200).collect(),
    }
}

impl FirestoreClient {
    /// Builds a client for `settings`. Call [`RemoteCatalog::connect`]
    /// before issuing requests.
    pub fn new(settings: RemoteSettings) -> SyncResult<Self> {
        let http = reqwest::Client::builder().build()?;

        Ok(FirestoreClient {
            http,
            settings,
            connected: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    fn ensure_connected(&self) -> SyncResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SyncError::NotConfigured)
        }
    }

    /// Builds `{base}/{segments..}?key=..&{params..}`.
    fn url(&self, segments: &[&str], params: &[(&str, &str)]) -> SyncResult<Url> {
        let mut url = Url::parse(&self.settings.endpoint)?;

        url.path_segments_mut()
            .map_err(|_| {
                SyncError::InvalidUrl(format!("{} cannot be a base URL", self.settings.endpoint))
            })?
            .pop_if_empty()
            .extend([
                "projects",
                self.settings.project_id.as_str(),
                "databases",
                self.settings.database.as_str(),
                "documents",
            ])
            .extend(segments);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", &self.settings.api_key);
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }

        Ok(url)
    }

    /// Sends a request, mapping non-success statuses to `HttpStatus`.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> SyncResult<reqwest::Response> {
        let response = request.timeout(timeout).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SyncError::HttpStatus {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
    ) -> SyncResult<()> {
        let url = self.url(&[collection], &[("documentId", id)])?;
        let request = self.http.post(url).json(document);

        match self.send(request, self.settings.request_timeout()).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_conflict() => {
                info!(collection = %collection, id = %id, "Document already exists remotely");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RemoteCatalog for FirestoreClient {
    fn connect(&self) -> bool {
        let configured = self.settings.has_credentials();

        if configured {
            info!(project_id = %self.settings.project_id, "Remote catalog configured");
        } else {
            warn!("Remote catalog credentials missing or placeholders, staying offline");
        }

        self.connected.store(configured, Ordering::Release);
        configured
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn probe(&self) -> SyncResult<()> {
        self.ensure_connected()?;

        let url = self.url(&[PRODUCTS_COLLECTION], &[("pageSize", "1")])?;
        self.send(self.http.get(url), self.settings.request_timeout())
            .await?;

        debug!("Remote catalog reachable");
        Ok(())
    }

    async fn get_by_code(&self, code: &str) -> SyncResult<Option<Product>> {
        self.ensure_connected()?;

        let url = self.url(&[PRODUCTS_COLLECTION, code], &[])?;
        let response = match self
            .send(self.http.get(url), self.settings.request_timeout())
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                debug!(code = %code, "Product not in remote catalog");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let document: Document = response.json().await?;
        codec::decode_product(document).map(Some)
    }

    async fn list_all(&self) -> SyncResult<Vec<Product>> {
        self.ensure_connected()?;

        let page_size = self.settings.page_size.to_string();
        let mut products = Vec::new();
        let mut page_token: Option<String> = None;
        let mut skipped = 0usize;

        loop {
            let mut params = vec![("pageSize", page_size.as_str())];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let url = self.url(&[PRODUCTS_COLLECTION], &params)?;
            let page: ListDocumentsResponse = self
                .send(self.http.get(url), self.settings.list_timeout())
                .await?
                .json()
                .await?;

            debug!(documents = page.documents.len(), "Fetched catalog page");

            for document in page.documents {
                let name = document.name.clone();
                match codec::decode_product(document) {
                    Ok(product) => products.push(product),
                    Err(e) => {
                        skipped += 1;
                        warn!(document = %name, error = %e, "Skipping undecodable product document");
                    }
                }
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(count = products.len(), skipped, "Remote catalog downloaded");
        Ok(products)
    }

    async fn create(&self, product: &Product) -> SyncResult<()> {
        self.ensure_connected()?;

        let document = codec::encode_product(product)?;
        self.create_document(PRODUCTS_COLLECTION, &product.code, &document)
            .await?;

        debug!(code = %product.code, "Product created remotely");
        Ok(())
    }

    async fn update_quantity(&self, code: &str, quantity: i64) -> SyncResult<()> {
        self.ensure_connected()?;

        let url = self.url(
            &[PRODUCTS_COLLECTION, code],
            &[
                ("updateMask.fieldPaths", "quantity"),
                ("currentDocument.exists", "true"),
            ],
        )?;

        let mut document = Document::default();
        document
            .fields
            .insert("quantity".into(), WireValue::IntegerValue(quantity));

        self.send(
            self.http.patch(url).json(&document),
            self.settings.request_timeout(),
        )
        .await?;

        debug!(code = %code, quantity, "Remote quantity updated");
        Ok(())
    }

    async fn record_movement(&self, movement: &Movement) -> SyncResult<()> {
        self.ensure_connected()?;

        let document = codec::encode_movement(movement);
        self.create_document(MOVEMENTS_COLLECTION, &movement.id, &document)
            .await?;

        debug!(id = %movement.id, code = %movement.code, "Movement recorded remotely");
        Ok(())
    }

    async fn delete(&self, code: &str) -> SyncResult<()> {
        self.ensure_connected()?;

        let url = self.url(&[PRODUCTS_COLLECTION, code], &[])?;
        match self
            .send(self.http.delete(url), self.settings.request_timeout())
            .await
        {
            Ok(_) => {
                debug!(code = %code, "Product deleted remotely");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Continuation Helpers
// =============================================================================

/// Looks a product up on a spawned task and runs exactly one continuation.
///
/// "Not found" is a success with `None`; only transport, status and decode
/// failures reach `on_error`.
pub fn spawn_get_by_code<S, E>(
    remote: Arc<dyn RemoteCatalog>,
    code: impl Into<String>,
    on_success: S,
    on_error: E,
) -> JoinHandle<()>
where
    S: FnOnce(Option<Product>) + Send + 'static,
    E: FnOnce(SyncError) + Send + 'static,
{
    let code = code.into();
    tokio::spawn(async move {
        match remote.get_by_code(&code).await {
            Ok(product) => on_success(product),
            Err(e) => on_error(e),
        }
    })
}

/// Downloads the catalog on a spawned task and runs exactly one continuation.
pub fn spawn_list_all<S, E>(remote: Arc<dyn RemoteCatalog>, on_success: S, on_error: E) -> JoinHandle<()>
where
    S: FnOnce(Vec<Product>) + Send + 'static,
    E: FnOnce(SyncError) + Send + 'static,
{
    tokio::spawn(async move {
        match remote.list_all().await {
            Ok(products) => on_success(products),
            Err(e) => on_error(e),
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
