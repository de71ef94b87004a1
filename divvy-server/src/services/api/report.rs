use actix_web::web::*;

use crate::handlers::report;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/reports")
            .route("/current-balance", get().to(report::current_balance))
            .route("/category-totals", get().to(report::category_totals)),
    );
}
