use actix_web::web::*;

use crate::handlers::user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/user")
            .route("", get().to(user::get))
            .route("", post().to(user::create)),
    );
}
