pub mod auth;

use divvy_common::token::TokenError;

use actix_web::HttpRequest;
use std::borrow::Cow;

use crate::handlers::error::HttpErrorResponse;

pub struct ExtractedToken<'a> {
    pub value: Cow<'a, str>,
    pub from_cookie: bool,
}

pub trait TokenLocation {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<ExtractedToken<'a>>;
}

pub struct FromHeader {}
pub struct FromHeaderOrCookie {}

impl TokenLocation for FromHeader {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<ExtractedToken<'a>> {
        let header = req.headers().get(key)?;
        let value = header.to_str().ok()?;

        Some(ExtractedToken {
            value: Cow::Borrowed(value),
            from_cookie: false,
        })
    }
}

impl TokenLocation for FromHeaderOrCookie {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<ExtractedToken<'a>> {
        if let Some(extracted) = FromHeader::get_from_request(req, key) {
            return Some(extracted);
        }

        let cookie = req.cookie(key)?;

        Some(ExtractedToken {
            value: Cow::Owned(String::from(cookie.value())),
            from_cookie: true,
        })
    }
}

#[inline(always)]
fn into_actix_error_res<T>(result: Result<T, TokenError>) -> Result<T, HttpErrorResponse> {
    match result {
        Ok(t) => Ok(t),
        Err(TokenError::TokenInvalid) => Err(HttpErrorResponse::BadToken(String::from(
            "Token is invalid",
        ))),
        Err(TokenError::TokenExpired) => Err(HttpErrorResponse::TokenExpired(String::from(
            "Token is expired",
        ))),
        Err(TokenError::TokenMissing) => Err(HttpErrorResponse::TokenMissing(String::from(
            "Token is missing",
        ))),
        Err(TokenError::WrongTokenType) => Err(HttpErrorResponse::WrongTokenType(String::from(
            "Incorrect token type",
        ))),
    }
}
