use actix_web::web::*;

use crate::handlers::{budget, income, purchase, recurring, report};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/budgets")
            .route("", post().to(budget::create))
            .route("/{budget_slug}", get().to(budget::get))
            .route("/{budget_slug}/invitations", post().to(budget::invite))
            .route(
                "/{budget_slug}/members/{user_id}/role",
                patch().to(budget::set_member_role),
            )
            .route(
                "/{budget_slug}/members/{user_id}",
                delete().to(budget::remove_member),
            )
            .route("/{budget_slug}/leave", post().to(budget::leave))
            .route(
                "/{budget_slug}/categories",
                post().to(budget::create_category),
            )
            .route(
                "/{budget_slug}/categories/{category_id}",
                patch().to(budget::edit_category),
            )
            .route(
                "/{budget_slug}/categories/{category_id}",
                delete().to(budget::delete_category),
            )
            .route(
                "/{budget_slug}/purchases",
                get().to(purchase::get_purchases),
            )
            .route("/{budget_slug}/purchases", post().to(purchase::create))
            .route("/{budget_slug}/income", get().to(income::get_incomes))
            .route("/{budget_slug}/income", post().to(income::create))
            .route("/{budget_slug}/recurring", get().to(recurring::get_rules))
            .route(
                "/{budget_slug}/recurring/run-due",
                post().to(recurring::run_due),
            )
            .route(
                "/{budget_slug}/recurring/run-due-income",
                post().to(recurring::run_due_income),
            )
            .route(
                "/{budget_slug}/reports/spending-trend",
                get().to(report::spending_trend),
            ),
    )
    .service(
        scope("/invitations")
            .route("", get().to(budget::get_invitations))
            .route(
                "/{invitation_id}/accept",
                put().to(budget::accept_invitation),
            )
            .route(
                "/{invitation_id}/decline",
                put().to(budget::decline_invitation),
            )
            .route("/{invitation_id}", delete().to(budget::retract_invitation)),
    );
}
