use actix_web::web::*;

mod auth;
mod budget;
mod health;
mod income;
mod purchase;
mod recurring;
mod report;
mod user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .configure(auth::configure)
            .configure(budget::configure)
            .configure(health::configure)
            .configure(income::configure)
            .configure(purchase::configure)
            .configure(recurring::configure)
            .configure(report::configure)
            .configure(user::configure),
    );
}
