use divvy_common::db::{self, DaoError, DbThreadPool};
use divvy_common::request_io::{InputUser, OutputUser};
use divvy_common::validators::Validity;

use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::env;
use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeaderOrCookie;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_data: web::Json<InputUser>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = user_data.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_data = Arc::new(user_data);
    let user_data_ref = Arc::clone(&user_data);

    let (sender, receiver) = oneshot::channel();

    // Argon2id is expensive, so hashing happens off the async and blocking pools
    rayon::spawn(move || {
        let hash_result = argon2_kdf::Hasher::default()
            .algorithm(argon2_kdf::Algorithm::Argon2id)
            .salt_length(env::CONF.hash_salt_length)
            .hash_length(env::CONF.hash_length)
            .iterations(env::CONF.hash_iterations)
            .memory_cost_kib(env::CONF.hash_mem_cost_kib)
            .threads(env::CONF.hash_threads)
            .secret(argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key))
            .hash(user_data_ref.password.as_bytes());

        let hash = match hash_result {
            Ok(h) => h,
            Err(e) => {
                sender.send(Err(e)).expect("Sending to channel failed");
                return;
            }
        };

        sender.send(Ok(hash)).expect("Sending to channel failed");
    });

    let password_hash = match receiver.await? {
        Ok(h) => h,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to hash password",
            )));
        }
    };

    let user_data_ref = Arc::clone(&user_data);

    let user_id = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.create_user(
            &user_data_ref.email,
            &user_data_ref.display_name,
            &password_hash.to_string(),
        )
    })
    .await?
    {
        Ok(id) => id,
        Err(e) => match e {
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                    "A user with the given email address already exists",
                )));
            }
            _ => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to create user",
                )));
            }
        },
    };

    Ok(HttpResponse::Created().json(json!({ "id": user_id })))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let user = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.get_user_by_id(user_id)
    })
    .await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User not found"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get user",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputUser {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        created_timestamp: user.created_timestamp,
    }))
}
