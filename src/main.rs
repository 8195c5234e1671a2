use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use diagnostic_report_service::{
    AppState, app,
    config::Config,
    db::{self, PgSubmissionStore, SubmissionStore},
    llm::{self, LlmClient, RetryPolicy},
    telemetry::init_telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        "Starting diagnostic-report-service"
    );

    let store: Option<Arc<dyn SubmissionStore>> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            Some(Arc::new(PgSubmissionStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, submissions will not be stored");
            None
        }
    };

    let provider = Arc::new(llm::anthropic::AnthropicProvider::new(
        &config.anthropic_api_key,
        &config.anthropic_base_url,
    ));

    let retry = RetryPolicy::with_retries(
        config.llm_max_retries,
        std::time::Duration::from_millis(config.llm_retry_base_ms),
    );

    let (server_address, server_port) = server_of(&config.anthropic_base_url);
    let llm_client = Arc::new(
        LlmClient::new(provider, config.llm_timeout(), retry).with_server(server_address, server_port),
    );

    tracing::info!(
        provider = llm_client.provider_name(),
        model = %config.llm_model,
        max_retries = config.llm_max_retries,
        web_search_max_uses = config.web_search_max_uses,
        "LLM client initialized"
    );

    let state = AppState::new(config.clone(), llm_client, store);
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

/// Host and port of the provider endpoint, for span attributes.
fn server_of(base_url: &str) -> (String, u16) {
    let (default_port, rest) = match base_url.split_once("://") {
        Some(("http", rest)) => (80, rest),
        Some((_, rest)) => (443, rest),
        None => (443, base_url),
    };
    let authority = rest.split('/').next().unwrap_or(rest);

    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (authority.to_string(), default_port),
        },
        None => (authority.to_string(), default_port),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
