use actix_web::web::*;

use crate::handlers::income;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/income").route("/{income_id}", delete().to(income::delete)));
}
