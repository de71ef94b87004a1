use divvy_common::db::DbThreadPool;

use actix_web::{web, HttpResponse, Responder};
use diesel::RunQueryDsl;
use serde_json::json;

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(db_thread_pool: web::Data<DbThreadPool>) -> impl Responder {
    let db_is_reachable = web::block(move || {
        let Ok(mut db_connection) = db_thread_pool.get() else {
            return false;
        };

        diesel::sql_query("SELECT 1").execute(&mut db_connection).is_ok()
    })
    .await
    .unwrap_or(false);

    if !db_is_reachable {
        return HttpResponse::ServiceUnavailable().json(json!({ "db_reachable": false }));
    }

    HttpResponse::Ok().json(json!({ "db_reachable": true }))
}
