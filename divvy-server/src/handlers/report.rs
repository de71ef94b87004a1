use divvy_common::db::{self, DbThreadPool};
use divvy_common::reports;
use divvy_common::request_io::{
    InputBalanceParams, InputCategoryTotalsParams, InputTrendParams, TrendSelection,
};

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::handlers::error::HttpErrorResponse;
use crate::handlers::membership;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeaderOrCookie;

pub async fn current_balance(
    db_thread_pool: web::Data<DbThreadPool>,
    params: web::Query<InputBalanceParams>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let params = params.into_inner();
    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) = membership::resolve(&db_thread_pool, params.budget, user_id).await?;

    let date_from = params.date_from.and_then(|date| date.and_hms_opt(0, 0, 0));
    // The date_to filter includes the whole named day
    let date_to = params
        .date_to
        .and_then(|date| date.succ_opt())
        .and_then(|date| date.and_hms_opt(0, 0, 0));

    let balance = match web::block(move || {
        let report_dao = db::report::Dao::new(&db_thread_pool);
        report_dao.get_current_balance(budget_id, date_from, date_to)
    })
    .await?
    {
        Ok(b) => b,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get current balance",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(balance))
}

pub async fn category_totals(
    db_thread_pool: web::Data<DbThreadPool>,
    params: web::Query<InputCategoryTotalsParams>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let params = params.into_inner();
    let user_id = user_access_token.claims.user_id;

    let anchor = params.anchor_date.unwrap_or_else(|| Utc::now().date_naive());

    let Some(window) = params.period.window(anchor) else {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Anchor date is out of range.",
        )));
    };

    let (budget_id, _) = membership::resolve(&db_thread_pool, params.budget, user_id).await?;

    let totals = match web::block(move || {
        let report_dao = db::report::Dao::new(&db_thread_pool);
        report_dao.get_category_totals(budget_id, window)
    })
    .await?
    {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get category totals",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(totals))
}

pub async fn spending_trend(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    params: web::Query<InputTrendParams>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let params = params.into_inner();
    let user_id = user_access_token.claims.user_id;

    let selection = match params.selection() {
        Ok(selection) => selection,
        Err(msg) => return Err(HttpErrorResponse::IncorrectlyFormed(msg)),
    };

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let selected_ids = match &selection {
        TrendSelection::Total => Vec::new(),
        TrendSelection::Single(category_id) => vec![*category_id],
        TrendSelection::Set { category_ids, .. } => category_ids.clone(),
    };

    if !selected_ids.is_empty() {
        let db_thread_pool_ref = db_thread_pool.clone();

        let budget_categories = match web::block(move || {
            let budget_dao = db::budget::Dao::new(&db_thread_pool_ref);
            budget_dao.get_categories(budget_id)
        })
        .await?
        {
            Ok(c) => c,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get categories",
                )));
            }
        };

        // Referencing a category outside the budget is a malformed request;
        // membership privacy is already enforced by the slug resolution above
        for category_id in &selected_ids {
            if !budget_categories
                .iter()
                .any(|category| category.id == *category_id)
            {
                return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
                    "Category does not belong to the budget",
                )));
            }
        }
    }

    let today = Utc::now().date_naive();

    let Some(current_window) = params.period.window(today) else {
        return Err(HttpErrorResponse::InternalError(String::from(
            "Failed to compute report range",
        )));
    };

    let Some(previous_window) = reports::previous_window(current_window, params.period) else {
        return Err(HttpErrorResponse::InternalError(String::from(
            "Failed to compute report range",
        )));
    };

    let trend = match web::block(move || {
        let report_dao = db::report::Dao::new(&db_thread_pool);
        report_dao.get_spending_trend(
            budget_id,
            params.period,
            &selection,
            current_window,
            previous_window,
        )
    })
    .await?
    {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get spending trend",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(trend))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use chrono::{Duration, NaiveDateTime};
    use divvy_common::models::budget_member::MemberRole;
    use divvy_common::reports::TrendPeriod;
    use divvy_common::request_io::{InputPurchase, InputSettle};
    use uuid::Uuid;

    use crate::env;
    use crate::handlers::test_utils::{self, read_body_json};
    use crate::services;

    /// Creates a purchase through the API and returns its id.
    async fn seed_purchase(
        access_token: &str,
        budget_slug: &str,
        category_id: Uuid,
        amount_cents: i64,
        paid_at: Option<NaiveDateTime>,
    ) -> Uuid {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .configure(services::api::configure),
        )
        .await;

        let input = InputPurchase {
            item_name: String::from("Report fixture"),
            category_id,
            amount_cents,
            paid_at,
            paid_by: None,
            shared: true,
            split_percent_for_payer: None,
            shares_override: None,
            notes: None,
            recurring: None,
        };

        let req = TestRequest::post()
            .uri(&format!("/api/budgets/{budget_slug}/purchases"))
            .insert_header(("AccessToken", access_token))
            .set_json(&input)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp_json = read_body_json(resp).await;
        Uuid::try_parse(resp_json["purchase"]["id"].as_str().unwrap()).unwrap()
    }

    #[actix_web::test]
    async fn test_current_balance_between_two_members() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .configure(services::api::configure),
        )
        .await;

        let (owner, owner_token) = test_utils::create_user().await;
        let (_, budget_slug) = test_utils::create_budget(&owner_token).await;
        let (member, member_token) =
            test_utils::add_budget_member(&owner_token, &budget_slug, MemberRole::Member).await;
        let category_ids = test_utils::get_category_ids(&owner_token, &budget_slug).await;

        // Owner fronts 100, member fronts 20, both split equally
        let big_purchase_id =
            seed_purchase(&owner_token, &budget_slug, category_ids[0], 100, None).await;
        seed_purchase(&member_token, &budget_slug, category_ids[0], 20, None).await;

        let req = TestRequest::get()
            .uri(&format!("/api/reports/current-balance?budget={budget_slug}"))
            .insert_header(("AccessToken", owner_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;

        let payer_totals = resp_json["payer_totals"].as_array().unwrap();
        assert_eq!(payer_totals.len(), 2);
        assert_eq!(payer_totals[0]["user_id"], owner.id.to_string());
        assert_eq!(payer_totals[0]["total_cents"], 100);
        assert_eq!(payer_totals[1]["user_id"], member.id.to_string());
        assert_eq!(payer_totals[1]["total_cents"], 20);

        assert_eq!(resp_json["pairs"].as_array().unwrap().len(), 2);

        let net = &resp_json["net_between_two_users"];
        assert_eq!(net["debtor_id"], member.id.to_string());
        assert_eq!(net["payer_id"], owner.id.to_string());
        assert_eq!(net["amount_cents"], 40);

        // Settling the larger purchase flips the net direction
        let req = TestRequest::patch()
            .uri(&format!("/api/purchases/{big_purchase_id}/settle"))
            .insert_header(("AccessToken", member_token.as_str()))
            .set_json(InputSettle { settled: true })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::get()
            .uri(&format!("/api/reports/current-balance?budget={budget_slug}"))
            .insert_header(("AccessToken", member_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["pairs"].as_array().unwrap().len(), 1);

        let net = &resp_json["net_between_two_users"];
        assert_eq!(net["debtor_id"], owner.id.to_string());
        assert_eq!(net["payer_id"], member.id.to_string());
        assert_eq!(net["amount_cents"], 10);

        // Non-members see the same thing as a missing budget
        let (_, outsider_token) = test_utils::create_user().await;
        let req = TestRequest::get()
            .uri(&format!("/api/reports/current-balance?budget={budget_slug}"))
            .insert_header(("AccessToken", outsider_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_current_balance_respects_date_range() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .configure(services::api::configure),
        )
        .await;

        let (_, access_token) = test_utils::create_user().await;
        let (_, budget_slug) = test_utils::create_budget(&access_token).await;
        let category_ids = test_utils::get_category_ids(&access_token, &budget_slug).await;

        let old_paid_at = "2023-05-10T08:00:00".parse::<NaiveDateTime>().unwrap();
        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[0],
            500,
            Some(old_paid_at),
        )
        .await;
        seed_purchase(&access_token, &budget_slug, category_ids[0], 300, None).await;

        let req = TestRequest::get()
            .uri(&format!("/api/reports/current-balance?budget={budget_slug}"))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["payer_totals"][0]["total_cents"], 800);
        // Net debt is only reported for two-member budgets
        assert!(resp_json["net_between_two_users"].is_null());

        let req = TestRequest::get()
            .uri(&format!(
                "/api/reports/current-balance?budget={budget_slug}&date_from=2024-01-01"
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["payer_totals"][0]["total_cents"], 300);

        // date_to includes the whole named day
        let req = TestRequest::get()
            .uri(&format!(
                "/api/reports/current-balance?budget={budget_slug}&date_to=2023-05-10"
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["payer_totals"][0]["total_cents"], 500);
    }

    #[actix_web::test]
    async fn test_category_totals_windowed_by_period() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .configure(services::api::configure),
        )
        .await;

        let (_, access_token) = test_utils::create_user().await;
        let (_, budget_slug) = test_utils::create_budget(&access_token).await;
        let category_ids = test_utils::get_category_ids(&access_token, &budget_slug).await;

        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[0],
            150,
            Some("2023-06-05T10:00:00".parse::<NaiveDateTime>().unwrap()),
        )
        .await;
        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[1],
            900,
            Some("2023-06-10T09:00:00".parse::<NaiveDateTime>().unwrap()),
        )
        .await;
        // Sunday before the anchored week
        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[0],
            9_999,
            Some("2023-06-04T23:00:00".parse::<NaiveDateTime>().unwrap()),
        )
        .await;

        let req = TestRequest::get()
            .uri(&format!(
                "/api/reports/category-totals?budget={budget_slug}&period=week&anchor_date=2023-06-07"
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["grand_total_cents"], 1050);
        // The week window is Monday-aligned
        assert_eq!(resp_json["range"]["start"], "2023-06-05T00:00:00");
        assert_eq!(resp_json["range"]["end"], "2023-06-12T00:00:00");

        let items = resp_json["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["category_id"], category_ids[1].to_string());
        assert_eq!(items[0]["name"], "Utilities");
        assert_eq!(items[0]["color"], "#2211aa");
        assert_eq!(items[0]["total_cents"], 900);
        assert_eq!(items[1]["category_id"], category_ids[0].to_string());
        assert_eq!(items[1]["total_cents"], 150);

        // June as a whole picks up the pre-week purchase
        let req = TestRequest::get()
            .uri(&format!(
                "/api/reports/category-totals?budget={budget_slug}&period=month&anchor_date=2023-06-15"
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["grand_total_cents"], 11_049);

        // The anchor defaults to today
        seed_purchase(&access_token, &budget_slug, category_ids[0], 400, None).await;

        let req = TestRequest::get()
            .uri(&format!(
                "/api/reports/category-totals?budget={budget_slug}&period=month"
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["grand_total_cents"], 400);

        let (_, outsider_token) = test_utils::create_user().await;
        let req = TestRequest::get()
            .uri(&format!(
                "/api/reports/category-totals?budget={budget_slug}&period=week"
            ))
            .insert_header(("AccessToken", outsider_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_spending_trend_totals_and_change() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .configure(services::api::configure),
        )
        .await;

        let (_, access_token) = test_utils::create_user().await;
        let (_, budget_slug) = test_utils::create_budget(&access_token).await;
        let category_ids = test_utils::get_category_ids(&access_token, &budget_slug).await;

        let current_window = TrendPeriod::Week.window(Utc::now().date_naive()).unwrap();
        let previous_window = reports::previous_window(current_window, TrendPeriod::Week).unwrap();

        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[0],
            400,
            Some(current_window.start),
        )
        .await;
        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[0],
            100,
            Some(current_window.start + Duration::days(2)),
        )
        .await;
        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[0],
            1000,
            Some(previous_window.start),
        )
        .await;

        let req = TestRequest::get()
            .uri(&format!(
                "/api/budgets/{budget_slug}/reports/spending-trend?period=week"
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["current_total_cents"], 500);
        assert_eq!(resp_json["previous_total_cents"], 1000);
        assert_eq!(resp_json["change"]["amount_cents"], -500);
        assert_eq!(resp_json["change"]["direction"], "down");

        let points = resp_json["points"].as_array().unwrap();
        assert_eq!(points.len(), 7);
        assert_eq!(points[0]["amount_cents"], 400);
        assert_eq!(points[2]["amount_cents"], 100);

        let point_sum = points
            .iter()
            .map(|point| point["amount_cents"].as_i64().unwrap())
            .sum::<i64>();
        assert_eq!(point_sum, 500);

        // A total query has no per-category series
        assert!(resp_json.get("series").is_none());

        let (_, outsider_token) = test_utils::create_user().await;
        let req = TestRequest::get()
            .uri(&format!(
                "/api/budgets/{budget_slug}/reports/spending-trend?period=week"
            ))
            .insert_header(("AccessToken", outsider_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_spending_trend_category_selections() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .configure(services::api::configure),
        )
        .await;

        let (_, access_token) = test_utils::create_user().await;
        let (_, budget_slug) = test_utils::create_budget(&access_token).await;
        let category_ids = test_utils::get_category_ids(&access_token, &budget_slug).await;

        let current_window = TrendPeriod::Week.window(Utc::now().date_naive()).unwrap();

        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[0],
            250,
            Some(current_window.start),
        )
        .await;
        seed_purchase(
            &access_token,
            &budget_slug,
            category_ids[1],
            750,
            Some(current_window.start + Duration::days(1)),
        )
        .await;

        let req = TestRequest::get()
            .uri(&format!(
                "/api/budgets/{budget_slug}/reports/spending-trend?period=week&category={}",
                category_ids[0],
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["current_total_cents"], 250);

        let point_sum = resp_json["points"]
            .as_array()
            .unwrap()
            .iter()
            .map(|point| point["amount_cents"].as_i64().unwrap())
            .sum::<i64>();
        assert_eq!(point_sum, 250);

        // A category set renders one series per category
        let req = TestRequest::get()
            .uri(&format!(
                "/api/budgets/{budget_slug}/reports/spending-trend?period=week&categories={},{}",
                category_ids[0], category_ids[1],
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert_eq!(resp_json["current_total_cents"], 1000);
        assert!(resp_json.get("points").is_none());

        let series = resp_json["series"].as_array().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0]["category_id"], category_ids[0].to_string());
        assert_eq!(series[1]["category_id"], category_ids[1].to_string());

        let series_sum = |index: usize| -> i64 {
            series[index]["points"]
                .as_array()
                .unwrap()
                .iter()
                .map(|point| point["amount_cents"].as_i64().unwrap())
                .sum()
        };
        assert_eq!(series_sum(0), 250);
        assert_eq!(series_sum(1), 750);

        // Combining the set folds it back into a single point sequence
        let req = TestRequest::get()
            .uri(&format!(
                "/api/budgets/{budget_slug}/reports/spending-trend?period=week&categories={},{}&combine=true",
                category_ids[0], category_ids[1],
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json = read_body_json(resp).await;
        assert!(resp_json.get("series").is_none());

        let point_sum = resp_json["points"]
            .as_array()
            .unwrap()
            .iter()
            .map(|point| point["amount_cents"].as_i64().unwrap())
            .sum::<i64>();
        assert_eq!(point_sum, 1000);

        let req = TestRequest::get()
            .uri(&format!(
                "/api/budgets/{budget_slug}/reports/spending-trend?period=week&category=TOTAL&categories={}",
                category_ids[0],
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // A category outside the budget is a validation failure, not a missing
        // resource
        let req = TestRequest::get()
            .uri(&format!(
                "/api/budgets/{budget_slug}/reports/spending-trend?period=week&category={}",
                Uuid::now_v7(),
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::get()
            .uri(&format!(
                "/api/budgets/{budget_slug}/reports/spending-trend?period=week&category=groceries"
            ))
            .insert_header(("AccessToken", access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
