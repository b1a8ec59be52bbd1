use actix_web::{get, web, HttpResponse};

pub mod ws;

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(ws::hub_socket)
        .service(ws::dashboard_socket)
        .service(ws::dashboard_status);
}
