use actix_web::web::*;

use crate::handlers::auth;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/auth")
            .route("/signin", post().to(auth::sign_in))
            .route("/refresh", post().to(auth::refresh_tokens))
            .route("/signout", post().to(auth::sign_out)),
    );
}
