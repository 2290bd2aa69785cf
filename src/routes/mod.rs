// Route exports
pub mod runs;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(runs::configure);
}
