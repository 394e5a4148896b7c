use crate::server::{ApiError, AppState};
use ntex::web::{
    types::{Json, State},
    HttpResponse,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricesRequest {
    pub token_ids: Vec<String>,
}

/// USD price and 24h change for price provider ids, e.g. `["ethereum", "dai"]`.
pub async fn prices(
    body: Json<PricesRequest>,
    state: State<Arc<AppState>>,
) -> Result<HttpResponse, ApiError> {
    let mut ids: Vec<&str> = vec![];
    for id in body.token_ids.iter().map(|id| id.trim()) {
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Ok(HttpResponse::Ok().json(&serde_json::json!({})));
    }

    let quotes = state
        .aggregator
        .prices()
        .fetch_quotes(&ids)
        .await
        .map_err(ApiError::Prices)?;

    Ok(HttpResponse::Ok().json(&quotes))
}
