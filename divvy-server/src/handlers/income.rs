use divvy_common::db::recurring::NewRuleSpec;
use divvy_common::db::{self, DaoError, DbThreadPool};
use divvy_common::request_io::InputIncome;
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
    income_data: web::Json<InputIncome>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = income_data.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let income_data = income_data.into_inner();
    let user_id = user_access_token.claims.user_id;

    let now = Utc::now().naive_utc();
    let received_at = income_data.received_at.unwrap_or(now);

    let recurrence = match &income_data.recurring {
        Some(recurring) => match recurring.resolve(received_at, now) {
            Ok(resolved) => Some(resolved),
            Err(msg) => return Err(HttpErrorResponse::IncorrectlyFormed(msg)),
        },
        None => None,
    };

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let received_by = income_data.received_by.unwrap_or(user_id);

    if received_by != user_id {
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

        if !roster.contains(&received_by) {
            return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
                "Receiver is not a member of this budget",
            )));
        }
    }

    let created_income = match web::block(move || {
        let income_dao = db::income::Dao::new(&db_thread_pool);
        let rule_spec = recurrence.as_ref().map(NewRuleSpec::from);
        income_dao.create_income(
            budget_id,
            &income_data.item_name,
            income_data.amount_cents,
            received_at,
            income_data.notes.as_deref(),
            received_by,
            user_id,
            rule_spec.as_ref(),
        )
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create income",
            )));
        }
    };

    Ok(HttpResponse::Created().json(created_income))
}

pub async fn get_incomes(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let incomes = match web::block(move || {
        let income_dao = db::income::Dao::new(&db_thread_pool);
        income_dao.get_incomes(budget_id)
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get incomes",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(incomes))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    income_id: web::Path<Uuid>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let income_id = income_id.into_inner();
    let user_id = user_access_token.claims.user_id;

    match web::block(move || {
        let income_dao = db::income::Dao::new(&db_thread_pool);
        income_dao.soft_delete_income(income_id, user_id)
    })
    .await?
    {
        Ok(_) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Income not found"),
                DoesNotExistType::Income,
            ));
        }
        Err(DaoError::WontRunQuery) => {
            return Err(HttpErrorResponse::UserDisallowed(String::from(
                "Only the income's creator, the receiver, or a budget admin can delete an income",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete income",
            )));
        }
    };

    Ok(HttpResponse::Ok().finish())
}
