use ntex::web::HttpResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(&HealthResponse {
        status: "OK",
        message: "Server is running",
    })
}
