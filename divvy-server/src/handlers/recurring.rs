use divvy_common::db::{self, DaoError, DbThreadPool};
use divvy_common::models::recurring_rule::RuleKind;
use divvy_common::request_io::{InputRuleActive, OutputRunDueIncomes, OutputRunDuePurchases};

use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::handlers::membership;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeaderOrCookie;

pub async fn get_rules(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let rules = match web::block(move || {
        let recurring_dao = db::recurring::Dao::new(&db_thread_pool);
        recurring_dao.get_rules(budget_id)
    })
    .await?
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get recurring rules",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(rules))
}

pub async fn set_active(
    db_thread_pool: web::Data<DbThreadPool>,
    rule_id: web::Path<Uuid>,
    rule_data: web::Json<InputRuleActive>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let rule_id = rule_id.into_inner();
    let active = rule_data.active;
    let user_id = user_access_token.claims.user_id;

    let rule = match web::block(move || {
        let recurring_dao = db::recurring::Dao::new(&db_thread_pool);
        recurring_dao.set_active(rule_id, user_id, active)
    })
    .await?
    {
        Ok(r) => r,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Recurring rule not found"),
                DoesNotExistType::Rule,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to update recurring rule",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(rule))
}

pub async fn run_due(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let purchase_ids = match web::block(move || {
        let recurring_dao = db::recurring::Dao::new(&db_thread_pool);
        recurring_dao.run_due_rules(
            budget_id,
            RuleKind::Expense,
            Some(user_id),
            Utc::now().naive_utc(),
        )
    })
    .await?
    {
        Ok(ids) => ids,
        Err(DaoError::OutOfDate) => {
            return Err(HttpErrorResponse::OutOfDate(String::from(
                "Due rules were materialized by a concurrent request",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to run due rules",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputRunDuePurchases {
        created_count: purchase_ids.len(),
        purchase_ids,
    }))
}

pub async fn run_due_income(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let income_ids = match web::block(move || {
        let recurring_dao = db::recurring::Dao::new(&db_thread_pool);
        recurring_dao.run_due_rules(
            budget_id,
            RuleKind::Income,
            Some(user_id),
            Utc::now().naive_utc(),
        )
    })
    .await?
    {
        Ok(ids) => ids,
        Err(DaoError::OutOfDate) => {
            return Err(HttpErrorResponse::OutOfDate(String::from(
                "Due rules were materialized by a concurrent request",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to run due rules",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputRunDueIncomes {
        created_count: income_ids.len(),
        income_ids,
    }))
}
