use actix_web::web::*;

use crate::handlers::recurring;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/recurring").route("/{rule_id}", patch().to(recurring::set_active)));
}
