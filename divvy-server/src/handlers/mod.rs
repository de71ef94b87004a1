pub mod auth;
pub mod budget;
pub mod health;
pub mod income;
pub mod purchase;
pub mod recurring;
pub mod report;
pub mod user;

pub mod membership {
    use divvy_common::db::{self, DaoError, DbThreadPool};
    use divvy_common::models::budget_member::MemberRole;

    use actix_web::web;
    use uuid::Uuid;

    use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};

    /// Resolves a budget slug to the budget's id and the requesting user's role.
    /// Non-members receive the same NotFound error as a missing budget.
    pub async fn resolve(
        db_thread_pool: &web::Data<DbThreadPool>,
        budget_slug: String,
        user_id: Uuid,
    ) -> Result<(Uuid, MemberRole), HttpErrorResponse> {
        let db_thread_pool = web::Data::clone(db_thread_pool);

        match web::block(move || {
            let budget_dao = db::budget::Dao::new(&db_thread_pool);
            budget_dao.get_budget_id_and_role(&budget_slug, user_id)
        })
        .await?
        {
            Ok(membership) => Ok(membership),
            Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
                Err(HttpErrorResponse::DoesNotExist(
                    String::from("Budget not found"),
                    DoesNotExistType::Budget,
                ))
            }
            Err(e) => {
                log::error!("{e}");
                Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to check budget membership",
                )))
            }
        }
    }
}

pub mod error {
    use divvy_common::token::TokenError;

    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use serde::Serialize;
    use std::fmt;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    pub enum DoesNotExistType {
        User,
        Budget,
        Category,
        Purchase,
        Income,
        Rule,
        Invitation,
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(String),
        InvalidState(String),

        // 401
        IncorrectCredential(String),
        BadToken(String),
        TokenExpired(String),
        TokenMissing(String),
        WrongTokenType(String),

        // 403
        UserDisallowed(String),

        // 404
        DoesNotExist(String, DoesNotExistType),

        // 409
        ConflictWithExisting(String),
        OutOfDate(String),

        // 500
        InternalError(String),
    }

    #[derive(Debug, Serialize)]
    pub struct ErrorResponse {
        pub err_type: &'static str,
        pub err_message: String,
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let resp: ErrorResponse = self.into();
            write!(f, "{:?}", resp)
        }
    }

    impl From<HttpErrorResponse> for ErrorResponse {
        fn from(resp: HttpErrorResponse) -> Self {
            (&resp).into()
        }
    }

    impl From<&HttpErrorResponse> for ErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            match resp {
                // 400
                HttpErrorResponse::IncorrectlyFormed(msg) => ErrorResponse {
                    err_type: "INCORRECTLY_FORMED",
                    err_message: format!("Incorrectly formed request: {msg}"),
                },
                HttpErrorResponse::InvalidState(msg) => ErrorResponse {
                    err_type: "INVALID_STATE",
                    err_message: format!("Invalid state: {msg}"),
                },

                // 401
                HttpErrorResponse::IncorrectCredential(msg) => ErrorResponse {
                    err_type: "INCORRECT_CREDENTIAL",
                    err_message: format!("Incorrect credential: {msg}"),
                },
                HttpErrorResponse::BadToken(msg) => ErrorResponse {
                    err_type: "BAD_TOKEN",
                    err_message: format!("Bad token: {msg}"),
                },
                HttpErrorResponse::TokenExpired(msg) => ErrorResponse {
                    err_type: "TOKEN_EXPIRED",
                    err_message: format!("Token expired: {msg}"),
                },
                HttpErrorResponse::TokenMissing(msg) => ErrorResponse {
                    err_type: "TOKEN_MISSING",
                    err_message: format!("Token missing: {msg}"),
                },
                HttpErrorResponse::WrongTokenType(msg) => ErrorResponse {
                    err_type: "WRONG_TOKEN_TYPE",
                    err_message: format!("Wrong token type: {msg}"),
                },

                // 403
                HttpErrorResponse::UserDisallowed(msg) => ErrorResponse {
                    err_type: "USER_DISALLOWED",
                    err_message: format!("User disallowed: {msg}"),
                },

                // 404
                HttpErrorResponse::DoesNotExist(msg, dne_type) => ErrorResponse {
                    err_type: match dne_type {
                        DoesNotExistType::User => "USER_DOES_NOT_EXIST",
                        DoesNotExistType::Budget => "BUDGET_DOES_NOT_EXIST",
                        DoesNotExistType::Category => "CATEGORY_DOES_NOT_EXIST",
                        DoesNotExistType::Purchase => "PURCHASE_DOES_NOT_EXIST",
                        DoesNotExistType::Income => "INCOME_DOES_NOT_EXIST",
                        DoesNotExistType::Rule => "RULE_DOES_NOT_EXIST",
                        DoesNotExistType::Invitation => "INVITATION_DOES_NOT_EXIST",
                    },
                    err_message: format!("Does not exist: {msg}"),
                },

                // 409
                HttpErrorResponse::ConflictWithExisting(msg) => ErrorResponse {
                    err_type: "CONFLICT_WITH_EXISTING",
                    err_message: format!("Conflict with existing data: {msg}"),
                },
                HttpErrorResponse::OutOfDate(msg) => ErrorResponse {
                    err_type: "OUT_OF_DATE",
                    err_message: format!("Out of date: {msg}"),
                },

                // 500
                HttpErrorResponse::InternalError(msg) => ErrorResponse {
                    err_type: "INTERNAL_ERROR",
                    err_message: format!("Internal error: {msg}"),
                },
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code()).json(ErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_) | HttpErrorResponse::InvalidState(_) => {
                    StatusCode::BAD_REQUEST
                }
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::BadToken(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_)
                | HttpErrorResponse::WrongTokenType(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::UserDisallowed(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::ConflictWithExisting(_) | HttpErrorResponse::OutOfDate(_) => {
                    StatusCode::CONFLICT
                }
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError(String::from("Actix thread pool failure"))
        }
    }

    impl From<oneshot::error::RecvError> for HttpErrorResponse {
        fn from(_err: oneshot::error::RecvError) -> Self {
            HttpErrorResponse::InternalError(String::from("Rayon thread pool failure"))
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => {
                    HttpErrorResponse::BadToken(String::from("Token is invalid"))
                }
                TokenError::TokenExpired => {
                    HttpErrorResponse::TokenExpired(String::from("Token is expired"))
                }
                TokenError::TokenMissing => {
                    HttpErrorResponse::TokenMissing(String::from("Token is missing"))
                }
                TokenError::WrongTokenType => {
                    HttpErrorResponse::WrongTokenType(String::from("Incorrect token type"))
                }
            }
        }
    }
}
