mod resolve_client;

use actix_web::web;
use resolve_client::get_client_by_phone_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/clients/by-phone/{phone}",
        web::get().to(get_client_by_phone_controller),
    );
}
