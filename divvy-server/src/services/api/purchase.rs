use actix_web::web::*;

use crate::handlers::purchase;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/purchases")
            .route("/{purchase_id}", get().to(purchase::get))
            .route("/{purchase_id}", delete().to(purchase::delete))
            .route("/{purchase_id}/settle", patch().to(purchase::set_settled)),
    );
}
