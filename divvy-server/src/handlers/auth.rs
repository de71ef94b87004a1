use divvy_common::db::{self, DaoError, DbThreadPool};
use divvy_common::request_io::{CredentialPair, TokenPair};
use divvy_common::token::auth_token::{AuthToken, AuthTokenType, NewAuthTokenClaims};
use divvy_common::validators::Validity;

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpResponse};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{
    Access, Refresh, RequestAuthTokenType, UnverifiedToken, VerifiedToken,
};
use crate::middleware::FromHeaderOrCookie;

pub async fn sign_in(
    db_thread_pool: web::Data<DbThreadPool>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = credentials.validate_email_address() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let credentials = Arc::new(credentials);
    let credentials_ref = Arc::clone(&credentials);
    let db_thread_pool_ref = db_thread_pool.clone();

    // A lookup miss gets the same response as a bad password so the endpoint
    // can't be used to probe which email addresses have accounts
    let user = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool_ref);
        user_dao.get_user_by_email(&credentials_ref.email)
    })
    .await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::IncorrectCredential(String::from(
                "Incorrect email or password",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get user",
            )));
        }
    };

    let user = Arc::new(user);
    let user_ref = Arc::clone(&user);
    let credentials_ref = Arc::clone(&credentials);

    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash = match argon2_kdf::Hash::from_str(&user_ref.password_hash) {
            Ok(h) => h,
            Err(e) => {
                sender.send(Err(e)).expect("Sending to channel failed");
                return;
            }
        };

        let does_match = hash.verify_with_secret(
            credentials_ref.password.as_bytes(),
            argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key),
        );

        sender.send(Ok(does_match)).expect("Sending to channel failed");
    });

    let password_matches = match receiver.await? {
        Ok(m) => m,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to verify password",
            )));
        }
    };

    if !password_matches {
        return Err(HttpErrorResponse::IncorrectCredential(String::from(
            "Incorrect email or password",
        )));
    }

    let token_pair = gen_token_pair(user.id, &user.email);
    let (access_cookie, refresh_cookie) = auth_cookies(&token_pair);

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(token_pair))
}

pub async fn refresh_tokens(
    db_thread_pool: web::Data<DbThreadPool>,
    token: UnverifiedToken<Refresh, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let token_signature = token.decoded.signature.clone();
    let claims = token.verify()?;
    let token_expiration = claims.expiration;

    let token_is_used = match web::block(move || {
        let auth_dao = db::auth::Dao::new(&db_thread_pool);
        auth_dao.check_is_token_on_blacklist_and_blacklist(&token_signature, token_expiration)
    })
    .await?
    {
        Ok(is_used) => is_used,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to check token blacklist",
            )));
        }
    };

    if token_is_used {
        return Err(HttpErrorResponse::BadToken(String::from(
            "Token has already been used",
        )));
    }

    let token_pair = gen_token_pair(claims.user_id, &claims.user_email);

    let mut resp = HttpResponse::Ok();

    if token.from_cookie {
        let (access_cookie, refresh_cookie) = auth_cookies(&token_pair);
        resp.cookie(access_cookie);
        resp.cookie(refresh_cookie);
    }

    Ok(resp.json(token_pair))
}

pub async fn sign_out(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
    refresh_token: UnverifiedToken<Refresh, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let refresh_token_signature = refresh_token.decoded.signature.clone();
    let refresh_token_claims = refresh_token.verify()?;

    if refresh_token_claims.user_id != user_access_token.claims.user_id {
        return Err(HttpErrorResponse::UserDisallowed(String::from(
            "Refresh token does not belong to user",
        )));
    }

    let token_expiration = refresh_token_claims.expiration;

    match web::block(move || {
        let auth_dao = db::auth::Dao::new(&db_thread_pool);
        auth_dao.blacklist_token(&refresh_token_signature, token_expiration)
    })
    .await?
    {
        Ok(()) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to blacklist token",
            )));
        }
    }

    let (access_cookie, refresh_cookie) = removal_cookies();

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .finish())
}

fn gen_token_pair(user_id: Uuid, user_email: &str) -> TokenPair {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Failed to fetch system time");

    let access_token_claims = NewAuthTokenClaims {
        user_id,
        user_email,
        expiration: (now + Access::token_lifetime()).as_secs(),
        token_type: AuthTokenType::Access,
    };
    let access_token = AuthToken::sign_new(access_token_claims, &env::CONF.token_signing_key);

    let refresh_token_claims = NewAuthTokenClaims {
        user_id,
        user_email,
        expiration: (now + Refresh::token_lifetime()).as_secs(),
        token_type: AuthTokenType::Refresh,
    };
    let refresh_token = AuthToken::sign_new(refresh_token_claims, &env::CONF.token_signing_key);

    TokenPair {
        access_token,
        refresh_token,
        server_time: now.as_millis(),
    }
}

fn auth_cookies(token_pair: &TokenPair) -> (Cookie<'_>, Cookie<'_>) {
    let access_cookie = Cookie::build(Access::token_name(), token_pair.access_token.as_str())
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(
            Access::token_lifetime().as_secs() as i64
        ))
        .finish();

    let refresh_cookie = Cookie::build(Refresh::token_name(), token_pair.refresh_token.as_str())
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(
            Refresh::token_lifetime().as_secs() as i64
        ))
        .finish();

    (access_cookie, refresh_cookie)
}

fn removal_cookies() -> (Cookie<'static>, Cookie<'static>) {
    let mut access_cookie = Cookie::build(Access::token_name(), "").path("/").finish();
    access_cookie.make_removal();

    let mut refresh_cookie = Cookie::build(Refresh::token_name(), "").path("/").finish();
    refresh_cookie.make_removal();

    (access_cookie, refresh_cookie)
}
