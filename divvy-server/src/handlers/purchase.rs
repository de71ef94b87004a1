use divvy_common::allocation::{self, SplitMode};
use divvy_common::db::recurring::NewRuleSpec;
use divvy_common::db::{self, DaoError, DbThreadPool};
use divvy_common::request_io::{InputPurchase, InputPurchaseFilters, InputSettle};
use divvy_common::validators::Validity;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::handlers::membership;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeaderOrCookie;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    purchase_data: web::Json<InputPurchase>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = purchase_data.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let mut purchase_data = purchase_data.into_inner();
    let user_id = user_access_token.claims.user_id;

    let now = Utc::now().naive_utc();
    let paid_at = purchase_data.paid_at.unwrap_or(now);

    let recurrence = match &purchase_data.recurring {
        Some(recurring) => match recurring.resolve(paid_at, now) {
            Ok(resolved) => Some(resolved),
            Err(msg) => return Err(HttpErrorResponse::IncorrectlyFormed(msg)),
        },
        None => None,
    };

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let category_id = purchase_data.category_id;
    let db_thread_pool_ref = db_thread_pool.clone();

    let category_in_budget = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool_ref);
        budget_dao.category_is_in_budget(category_id, budget_id)
    })
    .await?
    {
        Ok(in_budget) => in_budget,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to check category",
            )));
        }
    };

    if !category_in_budget {
        return Err(HttpErrorResponse::DoesNotExist(
            String::from("Category not found in budget"),
            DoesNotExistType::Category,
        ));
    }

    let db_thread_pool_ref = db_thread_pool.clone();

    let roster = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool_ref);
        budget_dao.get_member_user_ids(budget_id)
    })
    .await?
    {
        Ok(member_ids) => member_ids,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get budget members",
            )));
        }
    };

    let paid_by = purchase_data.paid_by.unwrap_or(user_id);

    // An unshared purchase is carried entirely by the payer, whatever split
    // parameters came with the request
    let split_mode = if !purchase_data.shared {
        SplitMode::Personal
    } else if let Some(portions) = purchase_data.shares_override.take() {
        SplitMode::Manual { portions }
    } else if let Some(payer_percent) = purchase_data.split_percent_for_payer {
        SplitMode::TwoParty { payer_percent }
    } else {
        SplitMode::EqualSplit
    };

    let shares =
        match allocation::allocate(purchase_data.amount_cents, paid_by, &roster, &split_mode) {
            Ok(shares) => shares,
            Err(e) => return Err(HttpErrorResponse::IncorrectlyFormed(e.to_string())),
        };

    let created_purchase = match web::block(move || {
        let purchase_dao = db::purchase::Dao::new(&db_thread_pool);
        let rule_spec = recurrence.as_ref().map(NewRuleSpec::from);
        purchase_dao.create_purchase(
            budget_id,
            category_id,
            &purchase_data.item_name,
            purchase_data.amount_cents,
            paid_at,
            purchase_data.shared,
            purchase_data.notes.as_deref(),
            paid_by,
            user_id,
            &shares,
            rule_spec.as_ref(),
        )
    })
    .await?
    {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create purchase",
            )));
        }
    };

    Ok(HttpResponse::Created().json(created_purchase))
}

pub async fn get_purchases(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    filters: web::Query<InputPurchaseFilters>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let filters = filters.into_inner();
    let date_from = filters.date_from.and_then(|date| date.and_hms_opt(0, 0, 0));
    // The date_to filter includes the whole named day
    let date_to = filters
        .date_to
        .and_then(|date| date.succ_opt())
        .and_then(|date| date.and_hms_opt(0, 0, 0));

    let output_purchases = match web::block(move || {
        let purchase_dao = db::purchase::Dao::new(&db_thread_pool);
        purchase_dao.get_purchases(budget_id, filters.category, date_from, date_to)
    })
    .await?
    {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get purchases",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(output_purchases))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    purchase_id: web::Path<Uuid>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let purchase_id = purchase_id.into_inner();
    let user_id = user_access_token.claims.user_id;

    let output_purchase = match web::block(move || {
        let purchase_dao = db::purchase::Dao::new(&db_thread_pool);
        purchase_dao.get_purchase(purchase_id, user_id)
    })
    .await?
    {
        Ok(p) => p,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Purchase not found"),
                DoesNotExistType::Purchase,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get purchase",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(output_purchase))
}

pub async fn set_settled(
    db_thread_pool: web::Data<DbThreadPool>,
    purchase_id: web::Path<Uuid>,
    settle_data: web::Json<InputSettle>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let purchase_id = purchase_id.into_inner();
    let settled = settle_data.settled;
    let user_id = user_access_token.claims.user_id;

    let output_purchase = match web::block(move || {
        let purchase_dao = db::purchase::Dao::new(&db_thread_pool);
        purchase_dao.set_settled(purchase_id, user_id, settled)
    })
    .await?
    {
        Ok(p) => p,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Purchase not found"),
                DoesNotExistType::Purchase,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to update settlement",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(output_purchase))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    purchase_id: web::Path<Uuid>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let purchase_id = purchase_id.into_inner();
    let user_id = user_access_token.claims.user_id;

    match web::block(move || {
        let purchase_dao = db::purchase::Dao::new(&db_thread_pool);
        purchase_dao.soft_delete_purchase(purchase_id, user_id)
    })
    .await?
    {
        Ok(_) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Purchase not found"),
                DoesNotExistType::Purchase,
            ));
        }
        Err(DaoError::WontRunQuery) => {
            return Err(HttpErrorResponse::UserDisallowed(String::from(
                "Only the purchase's creator, the payer, or a budget admin can delete a purchase",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete purchase",
            )));
        }
    };

    Ok(HttpResponse::Ok().finish())
}
