//! Redaction server
//!
//! Serves PDF documents, persists redaction rectangles drawn over them and
//! produces redacted copies:
//!
//! - Document list and detail (page geometry, current redactions)
//! - Redaction create/delete, answered with the authoritative list as JSON,
//!   or as Datastar patch events when the request comes from Datastar
//! - Redacted PDF download, regenerated on every request

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod media;
mod render;
mod seed;
mod state;
mod store;

use config::{Args, Command, Config};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present, before env fallbacks are read
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.config.verbose)?;

    let state = AppState::new(&args.config).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state, &args.config).await,
        Command::Seed => {
            seed::seed(&state.store).await?;
            Ok(())
        }
        Command::Import { path, title } => {
            let document = seed::import(&state.store, &path, title).await?;
            println!("{}\t{}", document.id, document.title);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("redact_server={}", level).parse()?)
                .add_directive(format!("redact_core={}", level).parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();
    Ok(())
}

async fn serve(state: AppState, config: &Config) -> Result<()> {
    let app = router(Arc::new(state), config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Redaction server listening on http://{}", listener.local_addr()?);
    if config.strip_area_text {
        info!("Area redactions also strip covered text");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    // CORS configuration for a separately hosted viewer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Documents
        .route("/", get(handlers::list_documents))
        .route("/document/:id/", get(handlers::document_detail))
        .route("/document/:id/file/", get(handlers::document_file))
        .route("/document/:id/download/", get(handlers::download_redacted))
        // Redactions
        .route("/document/:id/redactions/", get(handlers::list_redactions))
        .route(
            "/document/:id/redactions/create/",
            post(handlers::create_redaction),
        )
        .route("/redactions/:id/", delete(handlers::delete_redaction));

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
