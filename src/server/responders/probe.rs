use ntex::web::HttpResponse;

pub async fn readiness() -> HttpResponse {
    HttpResponse::Ok().finish()
}

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().finish()
}
