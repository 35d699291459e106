use actix_csp_toggle::app::{configure_app, DemoState};
use actix_csp_toggle::{CspConfigBuilder, CspSettings, Environment, ModeHandle, SessionNonceStore};
use actix_web::{middleware::Logger, App, HttpServer};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "csp-toggle-demo", about = "Serve a page under a secure or insecure CSP")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "CSP_DEMO_BIND", default_value = "127.0.0.1:5001")]
    bind: String,

    /// TOML file with a `[csp]` table; `CSP_MODE` overrides its `mode`.
    #[arg(long, env = "CSP_SETTINGS")]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = CspSettings::load(args.config.as_deref());
    let environment = Environment::from_env();
    let mode = ModeHandle::new(settings.mode);

    log::info!(
        "starting CSP demo on {} (mode: {}, environment: {})",
        args.bind,
        settings.mode,
        environment
    );

    let config = CspConfigBuilder::new()
        .mode_source(mode.clone())
        .environment(environment)
        .session_store(Arc::new(SessionNonceStore::new()))
        .build();

    let state = DemoState {
        mode,
        settings_path: args.config,
    };

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(configure_app(config.clone(), state.clone()))
    })
    .bind(&args.bind)?
    .run()
    .await
}
