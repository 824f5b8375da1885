mod constants;
mod db;
mod middleware;
mod routes;
mod services;
mod state;
mod utils;

use std::sync::Arc;

use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    constants::{
        api::{BIND_ADDRESS, CORS_ALLOWED_ORIGIN},
        auth::JWT_SECRET,
        db::{DB_URL, TEXTBOOK_CONTENT_CSV, TEXTBOOK_TOPICS_CSV},
    },
    services::{
        llm::{anthropic::AnthropicClient, LlmClient},
        security::JwtKeys,
    },
    state::AppState,
};

#[derive(Parser)]
#[command(version, about)]
/// The linear algebra learning platform API.
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (the default).
    Serve,
    /// Create the database tables and import the textbook curriculum.
    InitDb {
        /// Drop every existing table first.
        #[arg(long)]
        drop: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("linalg_api=debug,tower_http=debug")),
        )
        .init();

    let db = db::connect(&DB_URL)
        .await
        .expect("Failed to connect to database");
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db).await,
        Command::InitDb { drop } => {
            db::seed::init_db(&db, &TEXTBOOK_TOPICS_CSV, &TEXTBOOK_CONTENT_CSV, drop)
                .await
                .expect("Failed to initialise database");
        }
    }
}

async fn serve(db: db::ConnectionPool) {
    db::schema::create_tables(&db)
        .await
        .expect("Failed to create database tables");
    let llm = AnthropicClient::from_config().map(|client| Arc::new(client) as Arc<dyn LlmClient>);
    if llm.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY not set, quiz question generation is disabled");
    }
    let state = AppState {
        db,
        jwt: JwtKeys::new(JWT_SECRET.as_bytes()),
        llm,
    };
    let cors = CorsLayer::new()
        .allow_origin(
            CORS_ALLOWED_ORIGIN
                .parse::<HeaderValue>()
                .expect("CORS_ALLOWED_ORIGIN is not a valid origin"),
        )
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());
    let app = routes::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(BIND_ADDRESS.as_str())
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on {}", BIND_ADDRESS.as_str());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to init Axum service");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for Ctrl+C");
    tracing::info!("Shutting down");
}
