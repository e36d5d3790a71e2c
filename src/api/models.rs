use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AliveResponse {
    pub ok: bool,
    pub message: String,
}
