use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ::common::storage::filesystem::FilesystemBlobStore;
use ::common::storage::{BlobHandle, BlobPath, BlobStore, BoxReader, StorageError};
use reqwest::Client;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use tempfile::TempDir;

use server::config::{
    AppConfig, AssetConfig, CorsConfig, DatabaseConfig, GeneratorConfig, ServerConfig,
    StorageAppConfig, UploadConfig,
};
use server::generator::{
    GeneratedImage, GenerationRequest, GeneratorError, ImageFormat, ImageGenerator,
};
use server::index::{AssetIndex, AssetRecord, IndexError, NewAsset};
use server::kind::AssetKind;
use server::state::AppState;

pub const FALLBACK_URL: &str = "https://placehold.test/fallback.png";
pub const RECIPE_FALLBACK_URL: &str = "https://placehold.test/recipe.png";

/// Minimal valid-looking PNG payload.
pub const PNG_BYTES: [u8; 12] = [
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
];

pub mod routes {
    pub const INGREDIENT_IMAGES: &str = "/api/v1/images/ingredients";
    pub const RECIPE_IMAGES: &str = "/api/v1/images/recipes";
    pub const ASSETS: &str = "/api/v1/assets";
    pub const ASSETS_SYNC: &str = "/api/v1/assets/sync";

    pub fn asset(name: &str) -> String {
        format!("/api/v1/assets/{name}")
    }

    pub fn asset_url(id: i64) -> String {
        format!("/api/v1/assets/{id}/url")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorMode {
    Png,
    Fail,
    Empty,
}

/// Fake generator that counts invocations.
pub struct CountingGenerator {
    calls: AtomicUsize,
    mode: GeneratorMode,
}

impl CountingGenerator {
    pub fn new(mode: GeneratorMode) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            mode,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for CountingGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<Option<GeneratedImage>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Widen the race window for concurrent callers.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        match self.mode {
            GeneratorMode::Png => Ok(Some(GeneratedImage {
                bytes: PNG_BYTES.to_vec(),
                format: ImageFormat::Png,
            })),
            GeneratorMode::Fail => Err(GeneratorError::Status {
                status: 503,
                body: "backend unavailable".into(),
            }),
            GeneratorMode::Empty => Ok(None),
        }
    }
}

/// Blob store whose every operation fails.
pub struct FailingBlobStore;

fn unavailable() -> StorageError {
    StorageError::Backend("store unavailable".into())
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn exists(&self, _path: &BlobPath) -> Result<bool, StorageError> {
        Err(unavailable())
    }

    async fn read_stream(&self, _path: &BlobPath) -> Result<BoxReader, StorageError> {
        Err(unavailable())
    }

    async fn write(&self, _: &BlobPath, _: &[u8], _: &str) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn make_public(&self, _path: &BlobPath) -> Result<String, StorageError> {
        Err(unavailable())
    }

    async fn list_by_prefix(&self, _: &str, _: &[&str]) -> Result<Vec<BlobHandle>, StorageError> {
        Err(unavailable())
    }
}

/// Delegates to an inner store but rejects writes under one prefix.
pub struct PrefixFailingStore {
    pub inner: Arc<dyn BlobStore>,
    pub failing_prefix: &'static str,
}

#[async_trait]
impl BlobStore for PrefixFailingStore {
    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError> {
        self.inner.exists(path).await
    }

    async fn read_stream(&self, path: &BlobPath) -> Result<BoxReader, StorageError> {
        self.inner.read_stream(path).await
    }

    async fn write(
        &self,
        path: &BlobPath,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        if path.as_str().starts_with(self.failing_prefix) {
            return Err(unavailable());
        }
        self.inner.write(path, data, content_type).await
    }

    async fn make_public(&self, path: &BlobPath) -> Result<String, StorageError> {
        self.inner.make_public(path).await
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        extensions: &[&str],
    ) -> Result<Vec<BlobHandle>, StorageError> {
        self.inner.list_by_prefix(prefix, extensions).await
    }
}

/// Index whose `find_exact` always misses, as if another worker inserted
/// the row right after the caller checked. Everything else delegates.
pub struct StaleIndex {
    pub inner: Arc<dyn AssetIndex>,
}

#[async_trait]
impl AssetIndex for StaleIndex {
    async fn find_exact(&self, _name: &str) -> Result<Option<AssetRecord>, IndexError> {
        Ok(None)
    }

    async fn find_similar(
        &self,
        query: &str,
        kind: Option<AssetKind>,
        limit: u64,
    ) -> Result<Vec<AssetRecord>, IndexError> {
        self.inner.find_similar(query, kind, limit).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<AssetRecord>, IndexError> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, asset: NewAsset) -> Result<i32, IndexError> {
        self.inner.save(asset).await
    }

    async fn update_public_url(
        &self,
        id: i32,
        public_url: &str,
    ) -> Result<Option<AssetRecord>, IndexError> {
        self.inner.update_public_url(id, public_url).await
    }
}

/// Fresh in-memory SQLite database with the schema applied.
pub async fn memory_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    // A single connection keeps every query on the same in-memory database.
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to open in-memory database");
    server::database::sync_schema(&db)
        .await
        .expect("Failed to sync schema");
    db
}

pub fn test_config(public_base_url: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        storage: StorageAppConfig {
            public_base_url: public_base_url.to_string(),
            ..Default::default()
        },
        generator: GeneratorConfig {
            endpoint: "http://127.0.0.1:9/unused".to_string(),
            api_key: None,
            model: "test".to_string(),
            size: "256x256".to_string(),
            timeout_secs: Some(1),
        },
        assets: AssetConfig {
            fallback_url: FALLBACK_URL.to_string(),
            recipe_fallback_url: RECIPE_FALLBACK_URL.to_string(),
            ..Default::default()
        },
        uploads: UploadConfig::default(),
    }
}

/// Core components wired against a temp directory and SQLite, without HTTP.
pub struct Harness {
    pub state: AppState,
    pub store: Arc<FilesystemBlobStore>,
    pub generator: Arc<CountingGenerator>,
    pub base_url: String,
    _dir: TempDir,
}

impl Harness {
    pub async fn new(mode: GeneratorMode) -> Self {
        Self::with_store(mode, |store| store).await
    }

    /// Build a harness whose components see `wrap(filesystem_store)`.
    pub async fn with_store(
        mode: GeneratorMode,
        wrap: impl FnOnce(Arc<dyn BlobStore>) -> Arc<dyn BlobStore>,
    ) -> Self {
        let base_url = "http://blobs.test".to_string();
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            FilesystemBlobStore::new(dir.path().to_path_buf(), base_url.clone())
                .await
                .expect("Failed to create blob store"),
        );
        let generator = CountingGenerator::new(mode);
        let db = memory_db().await;

        let shared: Arc<dyn BlobStore> = store.clone();
        let state = AppState::new(test_config(&base_url), db, wrap(shared), generator.clone());

        Self {
            state,
            store,
            generator,
            base_url,
            _dir: dir,
        }
    }

    /// Put a blob straight into the underlying store.
    pub async fn seed_blob(&self, path: &str, bytes: &[u8]) {
        let path = BlobPath::parse(path).expect("valid blob path");
        self.store
            .write(&path, bytes, &path.content_type())
            .await
            .expect("Failed to seed blob");
    }

    pub async fn blob_exists(&self, path: &str) -> bool {
        let path = BlobPath::parse(path).expect("valid blob path");
        self.store.exists(&path).await.expect("exists failed")
    }

    pub fn index(&self) -> &Arc<dyn AssetIndex> {
        &self.state.index
    }

    pub async fn seed_record(&self, name: &str, path: &str, url: &str, kind: AssetKind) -> i32 {
        self.state
            .index
            .save(NewAsset {
                canonical_name: ::common::normalize(name),
                storage_path: BlobPath::parse(path).expect("valid blob path"),
                public_url: url.to_string(),
                kind,
            })
            .await
            .expect("Failed to seed record")
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = res.bytes().await.expect("Failed to read body").to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            content_type,
            bytes,
            body,
        }
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub generator: Arc<CountingGenerator>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(GeneratorMode::Png).await
    }

    pub async fn spawn_with(mode: GeneratorMode) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}/blobs");

        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = FilesystemBlobStore::new(dir.path().to_path_buf(), base_url.clone())
            .await
            .expect("Failed to create blob store");
        let generator = CountingGenerator::new(mode);
        let db = memory_db().await;

        let state = AppState::new(
            test_config(&base_url),
            db,
            Arc::new(store),
            generator.clone(),
        );
        let app = server::build_router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            generator,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_absolute(&self.url(path)).await
    }

    pub async fn get_absolute(&self, url: &str) -> TestResponse {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    /// Multipart upload. `file` is `(file_name, bytes)`; `None` omits the part.
    pub async fn upload(
        &self,
        file: Option<(&str, Vec<u8>)>,
        item_name: &str,
        kind: &str,
        owner_id: Option<&str>,
    ) -> TestResponse {
        let mut form = reqwest::multipart::Form::new()
            .text("item_name", item_name.to_string())
            .text("kind", kind.to_string());
        if let Some(owner) = owner_id {
            form = form.text("owner_id", owner.to_string());
        }
        if let Some((name, bytes)) = file {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(name.to_string())
                .mime_str("application/octet-stream")
                .expect("Failed to set MIME type");
            form = form.part("file", part);
        }

        let res = self
            .client
            .post(self.url(routes::ASSETS))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send upload request");

        TestResponse::from_response(res).await
    }
}
