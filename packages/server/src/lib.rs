#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the DIME assistant.
//!
//! Serves the normalized place list for the map frontend and a chat
//! endpoint that answers citizen questions with the catalog corpus as LLM
//! context. The catalog is built at startup from the enriched snapshot
//! (or a live portal fetch when no snapshot exists) and can be rebuilt
//! with `POST /api/reload`.

pub mod catalog;
mod handlers;
pub mod prompt;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use dime_ai::providers::LlmProvider;
use dime_ingest::IngestError;
use dime_normalize::{NormalizeError, Normalizer};
use thiserror::Error;
use tokio::sync::RwLock;

pub use catalog::{Catalog, CatalogLoader, CatalogOrigin};

/// Environment variable listing extra CORS origins, comma-separated.
pub const ALLOWED_ORIGINS_ENV_VAR: &str = "ALLOWED_ORIGINS";

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 8000;

/// Local frontend origins allowed alongside `ALLOWED_ORIGINS`.
const DEV_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
];

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or running the HTTP server failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset selection failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The normalizer rules could not be loaded.
    #[error("Normalizer rules: {0}")]
    Normalize(#[from] NormalizeError),

    /// HTTP client setup failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Shared application state.
pub struct AppState {
    /// Current catalog. Reloads swap the `Arc`, never mutate the catalog.
    catalog: RwLock<Arc<Catalog>>,
    /// LLM provider, if one is configured.
    provider: Option<Box<dyn LlmProvider>>,
    /// Rebuilds the catalog on reload.
    loader: CatalogLoader,
}

impl AppState {
    /// Creates the state with an initial catalog.
    #[must_use]
    pub fn new(
        catalog: Catalog,
        provider: Option<Box<dyn LlmProvider>>,
        loader: CatalogLoader,
    ) -> Self {
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            provider,
            loader,
        }
    }

    /// Returns the current catalog.
    pub async fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&*self.catalog.read().await)
    }

    /// Swaps in a new catalog. Requests holding the old one keep it.
    pub async fn replace_catalog(&self, catalog: Catalog) {
        *self.catalog.write().await = Arc::new(catalog);
    }
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::banner)).service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/lugares", web::get().to(handlers::places))
            .route("/chat", web::post().to(handlers::chat))
            .route("/reload", web::post().to(handlers::reload)),
    );
}

/// Parses the `ALLOWED_ORIGINS` value into trimmed, non-empty origins.
#[must_use]
pub fn parse_origins(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

/// Permissive CORS when no origins are configured; otherwise the
/// configured origins plus the local development ones.
fn cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        return Cors::permissive();
    }

    origins
        .iter()
        .map(String::as_str)
        .chain(DEV_ORIGINS.iter().copied())
        .fold(
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allow_any_header()
                .supports_credentials()
                .max_age(3600),
            Cors::allowed_origin,
        )
}

/// Starts the DIME API server.
///
/// Resolves the dataset, loads the catalog, selects the LLM provider and
/// starts the Actix-Web HTTP server. A missing provider only disables
/// chat answers. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if configuration is invalid or the HTTP server
/// fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let dataset = dime_ingest::resolve_dataset(None)?;
    let normalizer = Normalizer::from_env()?;
    let loader = CatalogLoader::new(
        dataset,
        dime_ingest::snapshot_path(None),
        dime_ingest::app_token_from_env(),
        normalizer,
    )?;

    let provider = match dime_ai::providers::create_provider_from_env() {
        Ok(provider) => Some(provider),
        Err(e) => {
            log::warn!("Chat answers disabled: {e}");
            None
        }
    };

    log::info!("Loading catalog for {}...", loader.dataset().municipality);
    let catalog = loader.load().await;
    let state = web::Data::new(AppState::new(catalog, provider, loader));

    let origins = parse_origins(std::env::var(ALLOWED_ORIGINS_ENV_VAR).ok().as_deref());
    if origins.is_empty() {
        log::warn!("{ALLOWED_ORIGINS_ENV_VAR} not set, allowing every origin");
    }

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use actix_web::test;
    use dime_ai::AiError;
    use dime_ai::providers::{LlmResponse, Message, StopReason};
    use dime_ingest_models::{EnrichedRecord, Snapshot};
    use dime_neighborhood_models::DetectedZone;
    use dime_source_models::{DatasetDefinition, RawRecord};
    use serde_json::json;

    use super::*;
    use crate::prompt::{LOADING_REPLY, MISSING_PROVIDER_REPLY, PROVIDER_ERROR_REPLY};

    /// Answers with fixed text, or fails. Records the prompts it receives.
    struct FakeProvider {
        answer: Option<&'static str>,
        seen: Arc<Mutex<Vec<(String, Vec<Message>)>>>,
    }

    impl FakeProvider {
        fn answering(text: &'static str) -> Self {
            Self {
                answer: Some(text),
                seen: Arc::default(),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                seen: Arc::default(),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn chat(
            &self,
            system_prompt: &str,
            messages: &[Message],
        ) -> Result<LlmResponse, AiError> {
            self.seen
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), messages.to_vec()));
            self.answer
                .map(|text| LlmResponse {
                    text: text.to_string(),
                    stop_reason: StopReason::EndTurn,
                })
                .ok_or_else(|| AiError::Provider {
                    message: "quota exceeded".to_string(),
                })
        }
    }

    fn dataset() -> DatasetDefinition {
        dime_source::registry::find_dataset("tolu").unwrap()
    }

    fn record(value: serde_json::Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn fixture_snapshot() -> Snapshot {
        Snapshot {
            records: vec![EnrichedRecord::new(
                record(json!({
                    "infraestructura": "PISTA DE PATNAJE",
                    "categoria": "DEPORTE",
                    "geo_loc": { "type": "Point", "coordinates": [-75.58, 9.52] }
                })),
                Some("Calle 15, Santiago de Tolú".to_string()),
                &DetectedZone::General,
            )],
        }
    }

    fn loader(snapshot_path: PathBuf) -> CatalogLoader {
        CatalogLoader::new(dataset(), snapshot_path, None, Normalizer::builtin()).unwrap()
    }

    fn state(catalog: Catalog, provider: Option<Box<dyn LlmProvider>>) -> web::Data<AppState> {
        web::Data::new(AppState::new(
            catalog,
            provider,
            loader(PathBuf::from("unused.json")),
        ))
    }

    fn loaded_catalog() -> Catalog {
        Catalog::from_snapshot(&fixture_snapshot(), &dataset(), &Normalizer::builtin())
    }

    async fn ask(state: web::Data<AppState>, question: &str) -> serde_json::Value {
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(json!({ "pregunta": question }))
            .to_request();
        test::call_and_read_body_json(&app, req).await
    }

    #[actix_web::test]
    async fn banner_is_served_at_root() {
        let app = test::init_service(
            App::new()
                .app_data(state(Catalog::empty(), None))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["estado"], "DIME Online 🤖");
        assert_eq!(body["mensaje"], "¡El Cerebro de DIME está vivo! 🧠");
    }

    #[actix_web::test]
    async fn lists_places() {
        let app = test::init_service(
            App::new()
                .app_data(state(loaded_catalog(), None))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/lugares").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["id"], 1);
        assert_eq!(body[0]["nombre"], "Pista de Patinaje");
        assert_eq!(body[0]["direccion"], "Calle 15, Santiago de Tolú");
        assert_eq!(body[0]["ubicacion"]["lat"], 9.52);
    }

    #[actix_web::test]
    async fn health_reports_place_count() {
        let app = test::init_service(
            App::new()
                .app_data(state(loaded_catalog(), None))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["places"], 1);
    }

    #[actix_web::test]
    async fn chat_without_provider_asks_for_key() {
        let body = ask(state(loaded_catalog(), None), "¿Dónde patino?").await;
        assert_eq!(body["respuesta"], MISSING_PROVIDER_REPLY);
    }

    #[actix_web::test]
    async fn chat_with_empty_catalog_is_still_loading() {
        let provider: Box<dyn LlmProvider> = Box::new(FakeProvider::answering("unused"));
        let body = ask(state(Catalog::empty(), Some(provider)), "¿Dónde patino?").await;
        assert_eq!(body["respuesta"], LOADING_REPLY);
    }

    #[actix_web::test]
    async fn chat_provider_failure_is_friendly() {
        let provider: Box<dyn LlmProvider> = Box::new(FakeProvider::failing());
        let body = ask(state(loaded_catalog(), Some(provider)), "¿Dónde patino?").await;
        assert_eq!(body["respuesta"], PROVIDER_ERROR_REPLY);
    }

    #[actix_web::test]
    async fn chat_answers_with_catalog_context() {
        let provider = FakeProvider::answering("La Pista de Patinaje queda en la Calle 15.");
        let seen = Arc::clone(&provider.seen);

        let body = ask(state(loaded_catalog(), Some(Box::new(provider))), "¿Dónde patino?").await;
        assert_eq!(body["respuesta"], "La Pista de Patinaje queda en la Calle 15.");

        let seen = seen.lock().unwrap();
        let (system, messages) = &seen[0];
        assert!(system.contains("Asistente Guía Oficial de Santiago de Tolú"));
        assert!(system.contains(
            "- Pista de Patinaje (Deporte). Dirección: Calle 15, Santiago de Tolú.\n"
        ));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.starts_with("Pregunta del ciudadano: ¿Dónde patino?"));
    }

    #[actix_web::test]
    async fn reload_swaps_in_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        dime_ingest::snapshot::store(&path, &fixture_snapshot()).unwrap();

        let state = web::Data::new(AppState::new(Catalog::empty(), None, loader(path)));
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/api/reload").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["places"], 1);
        assert_eq!(state.catalog().await.origin(), CatalogOrigin::Snapshot);
    }

    #[::core::prelude::v1::test]
    fn parses_origin_list() {
        assert_eq!(
            parse_origins(Some(" https://dime.example.org , ,https://tolu.gov.co")),
            vec!["https://dime.example.org", "https://tolu.gov.co"]
        );
        assert!(parse_origins(None).is_empty());
        assert!(parse_origins(Some("  ")).is_empty());
    }
}
