use axum::{
    routing::get,
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tower_http::cors::{CorsLayer, Any};
use tracing::{info, warn};

use crate::api::models::{AliveResponse, ScrapeParams};
use crate::api::response;
use crate::models::SearchQuery;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/scraper", get(alive_handler))
        .route("/scraper/ebay", get(ebay_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn alive_handler() -> impl IntoResponse {
    Json(AliveResponse {
        ok: true,
        message: "scraper endpoint alive".to_string(),
    })
}

async fn ebay_handler(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    let keyword = params.keyword.unwrap_or_default();
    let query = match SearchQuery::new(&keyword, state.config.pipeline.max_pages) {
        Ok(query) => query,
        Err(e) => {
            warn!("Rejected request: {}", e);
            return e.into_response();
        }
    };

    info!("Processing request for keyword: {}", query.keyword());
    let start_time = std::time::Instant::now();

    // Overall budget for the whole run; the session is torn down on drop if it expires
    let result = tokio::time::timeout(
        state.config.request_timeout,
        state.pipeline.run(&query),
    ).await;

    let elapsed = start_time.elapsed();
    info!("Request processing took: {:?}", elapsed);

    match result {
        Ok(result) => {
            if result.ok {
                info!("Extracted {} item(s) for {:?}", result.items().len(), query.keyword());
            }
            response::from_result(result).into_response()
        }
        Err(_) => {
            warn!("Request timed out after {:?}", elapsed);
            response::error(
                StatusCode::GATEWAY_TIMEOUT,
                "Request processing timed out".to_string(),
            )
            .into_response()
        }
    }
}
