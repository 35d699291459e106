//! Demo routes: a static-asset scope that bypasses the CSP middleware, and a
//! wrapped scope with one page and a small JSON API for toggling the mode.

use crate::constants::STATIC_PREFIX;
use crate::core::config::CspConfig;
use crate::core::mode::{ModeHandle, PolicyMode};
use crate::middleware::{configure_csp, CspExtensions, CspMiddleware};
use crate::monitoring::stats::CspStats;
use crate::security::nonce::RequestNonce;
use crate::session::SessionNonceStore;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_JS: &str = "document.body.dataset.externalScript = 'ran';\n";
const SITE_CSS: &str = "body { font-family: sans-serif; margin: 2rem; }\n";

/// State shared by the demo handlers.
#[derive(Debug, Clone)]
pub struct DemoState {
    pub mode: ModeHandle,
    pub settings_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct ModeUpdate {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModeStatus {
    mode: PolicyMode,
    previous: Option<PolicyMode>,
    environment: String,
}

#[derive(Debug, Serialize)]
struct SessionStatus {
    session_id: Option<String>,
    session_nonce: Option<String>,
    request_nonce: Option<String>,
}

/// Registers the demo. `config` should read its mode from `state.mode` for
/// the toggle endpoints to have any effect.
pub fn configure_app(
    config: CspConfig,
    state: DemoState,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        configure_csp(&config)(cfg);
        cfg.app_data(web::Data::new(state));

        // Registered first so asset requests are answered before the CSP
        // middleware ever sees them.
        cfg.service(web::scope(STATIC_PREFIX).route("/{file}", web::get().to(static_asset)));

        cfg.service(
            web::scope("")
                .wrap(CspMiddleware::new(config))
                .route("/", web::get().to(index))
                .route("/api/mode", web::get().to(get_mode))
                .route("/api/mode", web::put().to(set_mode))
                .route("/api/mode/reload", web::post().to(reload_mode))
                .route("/api/stats", web::get().to(stats))
                .route("/api/session", web::get().to(session))
                .route("/api/session", web::delete().to(end_session))
                .default_service(web::to(not_found)),
        );
    }
}

async fn static_asset(path: web::Path<String>) -> HttpResponse {
    let (body, content_type) = match path.as_str() {
        "app.js" => (APP_JS, "application/javascript; charset=utf-8"),
        "site.css" => (SITE_CSS, "text/css; charset=utf-8"),
        _ => return HttpResponse::NotFound().finish(),
    };

    HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
        .body(body)
}

async fn index(req: HttpRequest, nonce: RequestNonce) -> HttpResponse {
    let mode = req.policy_mode().unwrap_or_default();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>CSP mode: {mode}</title>
    <link rel="stylesheet" href="/static/site.css">
</head>
<body>
    <h1>CSP mode: {mode}</h1>
    <p id="status" style="color: gray">inline script has not run</p>
    <script nonce="{nonce}">
        document.getElementById('status').textContent = 'nonce-bearing inline script ran';
    </script>
    <script>
        document.body.dataset.unsafeInline = 'ran';
    </script>
    <script src="/static/app.js" nonce="{nonce}"></script>
</body>
</html>"#,
        nonce = nonce.as_str(),
    );

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

async fn get_mode(state: web::Data<DemoState>, config: web::Data<CspConfig>) -> HttpResponse {
    HttpResponse::Ok().json(ModeStatus {
        mode: state.mode.get(),
        previous: None,
        environment: config.environment().to_string(),
    })
}

/// An unknown or missing mode sets Secure.
async fn set_mode(
    update: web::Json<ModeUpdate>,
    state: web::Data<DemoState>,
    config: web::Data<CspConfig>,
) -> HttpResponse {
    let mode = PolicyMode::from_setting(update.mode.as_deref());
    let previous = state.mode.set(mode);

    HttpResponse::Ok().json(ModeStatus {
        mode,
        previous: Some(previous),
        environment: config.environment().to_string(),
    })
}

async fn reload_mode(state: web::Data<DemoState>, config: web::Data<CspConfig>) -> HttpResponse {
    let previous = state.mode.get();
    let mode = state.mode.reload_from(state.settings_path.as_deref());

    HttpResponse::Ok().json(ModeStatus {
        mode,
        previous: Some(previous),
        environment: config.environment().to_string(),
    })
}

async fn stats(stats: web::Data<CspStats>) -> HttpResponse {
    HttpResponse::Ok().json(stats.snapshot())
}

async fn session(req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().json(SessionStatus {
        session_id: req.session_id(),
        session_nonce: req.session_nonce(),
        request_nonce: req.get_nonce(),
    })
}

async fn end_session(req: HttpRequest, store: Option<web::Data<SessionNonceStore>>) -> HttpResponse {
    let ended = match (store, req.session_id()) {
        (Some(store), Some(id)) => store.end(&id),
        _ => false,
    };

    if ended {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::NotFound().finish()
    }
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/plain; charset=utf-8")
        .body("Not Found")
}
