use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ebay_listing_scraper::{
    api::routes::create_router,
    browser::ChromiumEngine,
    config::Config,
    llm::OpenRouterClient,
    pipeline::PipelineOrchestrator,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chromiumoxide=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    if config.openrouter_api_key.is_none() {
        info!("OPENROUTER_API_KEY not set; summaries will be \"-\"");
    }

    let summarizer = OpenRouterClient::new(
        config.openrouter_api_key.clone(),
        config.pipeline.summary_model.clone(),
    )?;
    let pipeline = PipelineOrchestrator::new(
        Arc::new(ChromiumEngine::new(config.headless)),
        Arc::new(summarizer),
        config.pipeline.clone(),
    );

    // Create application state
    let app_state = AppState {
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;

    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
