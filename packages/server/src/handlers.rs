//! HTTP handler functions for the DIME API.

use actix_web::{HttpResponse, web};
use dime_ai::providers::Message;
use dime_server_models::{ApiBanner, ApiHealth, ChatRequest, ChatResponse, ReloadResponse};

use crate::AppState;
use crate::prompt::{
    LOADING_REPLY, MISSING_PROVIDER_REPLY, PROVIDER_ERROR_REPLY, system_prompt, user_prompt,
};

/// `GET /`
pub async fn banner() -> HttpResponse {
    HttpResponse::Ok().json(ApiBanner {
        estado: "DIME Online 🤖".to_string(),
        mensaje: "¡El Cerebro de DIME está vivo! 🧠".to_string(),
    })
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        places: state.catalog().await.places().len(),
    })
}

/// `GET /api/lugares`
///
/// Returns every place with a valid coordinate, normalized for display.
pub async fn places(state: web::Data<AppState>) -> HttpResponse {
    let catalog = state.catalog().await;
    HttpResponse::Ok().json(catalog.places())
}

/// `POST /api/chat`
///
/// Answers a citizen question from the catalog corpus. Failures become
/// fixed friendly replies, never error statuses.
pub async fn chat(state: web::Data<AppState>, body: web::Json<ChatRequest>) -> HttpResponse {
    let Some(provider) = state.provider.as_deref() else {
        return reply(MISSING_PROVIDER_REPLY);
    };

    let catalog = state.catalog().await;
    if catalog.is_empty() {
        return reply(LOADING_REPLY);
    }

    let system = system_prompt(
        &state.loader.dataset().municipality,
        catalog.prompt_context(),
    );
    let messages = [Message::user(user_prompt(&body.pregunta))];

    match provider.chat(&system, &messages).await {
        Ok(response) => reply(&response.text),
        Err(e) => {
            log::error!("Chat completion via {} failed: {e}", provider.name());
            reply(PROVIDER_ERROR_REPLY)
        }
    }
}

/// `POST /api/reload`
///
/// Rebuilds the catalog and swaps it in.
pub async fn reload(state: web::Data<AppState>) -> HttpResponse {
    let catalog = state.loader.load().await;
    let places = catalog.places().len();
    state.replace_catalog(catalog).await;
    HttpResponse::Ok().json(ReloadResponse { places })
}

fn reply(text: &str) -> HttpResponse {
    HttpResponse::Ok().json(ChatResponse {
        respuesta: text.to_string(),
    })
}
