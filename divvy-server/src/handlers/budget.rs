use divvy_common::db::{self, DaoError, DbThreadPool};
use divvy_common::models::budget_member::MemberRole;
use divvy_common::request_io::{
    InputBudget, InputBudgetInvite, InputCategory, InputEditCategory, InputMemberRole,
};
use divvy_common::validators::Validity;

use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::handlers::membership;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeaderOrCookie;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_data: web::Json<InputBudget>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = budget_data.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let budget_data = budget_data.into_inner();
    let user_id = user_access_token.claims.user_id;

    let output_budget = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.create_budget(
            &budget_data.slug,
            &budget_data.name,
            &budget_data.categories,
            user_id,
        )
    })
    .await?
    {
        Ok(b) => b,
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "A budget with the given slug already exists",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create budget",
            )));
        }
    };

    Ok(HttpResponse::Created().json(output_budget))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let budget_slug = budget_slug.into_inner();
    let user_id = user_access_token.claims.user_id;

    let output_budget = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.get_output_budget(&budget_slug, user_id)
    })
    .await?
    {
        Ok(b) => b,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Budget not found"),
                DoesNotExistType::Budget,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get budget",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(output_budget))
}

pub async fn invite(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    invitation_data: web::Json<InputBudgetInvite>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = invitation_data.validate_email_address() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    if invitation_data.role == MemberRole::Owner {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "A budget can only have one owner",
        )));
    }

    let user_id = user_access_token.claims.user_id;

    let (budget_id, caller_role) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    if !caller_role.has_admin_privileges() {
        return Err(HttpErrorResponse::UserDisallowed(String::from(
            "Only owners and admins can invite users",
        )));
    }

    let invitation_data = invitation_data.into_inner();
    let granted_role = invitation_data.role;
    let db_thread_pool_ref = db_thread_pool.clone();

    let recipient_user_id = match web::block(move || {
        let user_dao = db::user::Dao::new(&db_thread_pool_ref);
        user_dao.get_user_id_by_email(&invitation_data.recipient_email)
    })
    .await?
    {
        Ok(id) => id,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No user with the given email address exists"),
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

    let invitation_id = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.invite_user(budget_id, user_id, recipient_user_id, granted_role)
    })
    .await?
    {
        Ok(id) => id,
        Err(DaoError::WontRunQuery) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "User is already a member of this budget",
            )));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "User has already been invited to this budget",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create invitation",
            )));
        }
    };

    Ok(HttpResponse::Created().json(json!({ "id": invitation_id })))
}

pub async fn get_invitations(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let invitations = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.get_invites_for_user(user_id)
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get invitations",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(invitations))
}

pub async fn accept_invitation(
    db_thread_pool: web::Data<DbThreadPool>,
    invitation_id: web::Path<Uuid>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let invitation_id = invitation_id.into_inner();
    let user_id = user_access_token.claims.user_id;

    let budget_id = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.accept_invite(invitation_id, user_id)
    })
    .await?
    {
        Ok(id) => id,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Invitation not found"),
                DoesNotExistType::Invitation,
            ));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "User is already a member of this budget",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to accept invitation",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(json!({ "budget_id": budget_id })))
}

pub async fn decline_invitation(
    db_thread_pool: web::Data<DbThreadPool>,
    invitation_id: web::Path<Uuid>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let invitation_id = invitation_id.into_inner();
    let user_id = user_access_token.claims.user_id;

    match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.decline_invite(invitation_id, user_id)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Invitation not found"),
                DoesNotExistType::Invitation,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to decline invitation",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn retract_invitation(
    db_thread_pool: web::Data<DbThreadPool>,
    invitation_id: web::Path<Uuid>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let invitation_id = invitation_id.into_inner();
    let user_id = user_access_token.claims.user_id;

    let db_thread_pool_ref = db_thread_pool.clone();

    let invitation = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool_ref);
        budget_dao.get_invite(invitation_id)
    })
    .await?
    {
        Ok(i) => i,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Invitation not found"),
                DoesNotExistType::Invitation,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get invitation",
            )));
        }
    };

    if invitation.sender_user_id != user_id {
        let db_thread_pool_ref = db_thread_pool.clone();
        let budget_id = invitation.budget_id;

        let caller_role = match web::block(move || {
            let budget_dao = db::budget::Dao::new(&db_thread_pool_ref);
            budget_dao.get_role_in_budget(budget_id, user_id)
        })
        .await?
        {
            Ok(r) => r,
            Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
                return Err(HttpErrorResponse::UserDisallowed(String::from(
                    "Only the sender or a budget admin can retract an invitation",
                )));
            }
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to check budget membership",
                )));
            }
        };

        if !caller_role.has_admin_privileges() {
            return Err(HttpErrorResponse::UserDisallowed(String::from(
                "Only the sender or a budget admin can retract an invitation",
            )));
        }
    }

    match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.delete_invite(invitation_id)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Invitation not found"),
                DoesNotExistType::Invitation,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete invitation",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn set_member_role(
    db_thread_pool: web::Data<DbThreadPool>,
    path: web::Path<(String, Uuid)>,
    role_data: web::Json<InputMemberRole>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let (budget_slug, member_user_id) = path.into_inner();
    let user_id = user_access_token.claims.user_id;

    let (budget_id, caller_role) =
        membership::resolve(&db_thread_pool, budget_slug, user_id).await?;

    if caller_role != MemberRole::Owner {
        return Err(HttpErrorResponse::UserDisallowed(String::from(
            "Only the budget owner can change member roles",
        )));
    }

    if role_data.role == MemberRole::Owner {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "The owner role cannot be transferred",
        )));
    }

    let db_thread_pool_ref = db_thread_pool.clone();

    let member_role = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool_ref);
        budget_dao.get_role_in_budget(budget_id, member_user_id)
    })
    .await?
    {
        Ok(r) => r,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User is not a member of this budget"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to check budget membership",
            )));
        }
    };

    if member_role == MemberRole::Owner {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "The budget owner's role cannot be changed",
        )));
    }

    let new_role = role_data.role;

    match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.set_member_role(budget_id, member_user_id, new_role)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User is not a member of this budget"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to set member role",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn remove_member(
    db_thread_pool: web::Data<DbThreadPool>,
    path: web::Path<(String, Uuid)>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let (budget_slug, member_user_id) = path.into_inner();
    let user_id = user_access_token.claims.user_id;

    let (budget_id, caller_role) =
        membership::resolve(&db_thread_pool, budget_slug, user_id).await?;

    if !caller_role.has_admin_privileges() {
        return Err(HttpErrorResponse::UserDisallowed(String::from(
            "Only owners and admins can remove members",
        )));
    }

    let db_thread_pool_ref = db_thread_pool.clone();

    let member_role = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool_ref);
        budget_dao.get_role_in_budget(budget_id, member_user_id)
    })
    .await?
    {
        Ok(r) => r,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User is not a member of this budget"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to check budget membership",
            )));
        }
    };

    if member_role == MemberRole::Owner {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "The budget owner cannot be removed",
        )));
    }

    if caller_role == MemberRole::Admin && member_role == MemberRole::Admin {
        return Err(HttpErrorResponse::UserDisallowed(String::from(
            "Admins can only remove members",
        )));
    }

    match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.remove_member(budget_id, member_user_id)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User is not a member of this budget"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to remove member",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn leave(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (budget_id, caller_role) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    if caller_role == MemberRole::Owner {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "The budget owner cannot leave the budget",
        )));
    }

    match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.remove_member(budget_id, user_id)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User is not a member of this budget"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to leave budget",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn create_category(
    db_thread_pool: web::Data<DbThreadPool>,
    budget_slug: web::Path<String>,
    category_data: web::Json<InputCategory>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = category_data.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) =
        membership::resolve(&db_thread_pool, budget_slug.into_inner(), user_id).await?;

    let category_data = category_data.into_inner();

    let category = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.create_category(budget_id, &category_data.name, &category_data.color)
    })
    .await?
    {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create category",
            )));
        }
    };

    Ok(HttpResponse::Created().json(category))
}

pub async fn edit_category(
    db_thread_pool: web::Data<DbThreadPool>,
    path: web::Path<(String, Uuid)>,
    category_data: web::Json<InputEditCategory>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = category_data.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    if category_data.name.is_none() && category_data.color.is_none() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Nothing to update",
        )));
    }

    let (budget_slug, category_id) = path.into_inner();
    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) = membership::resolve(&db_thread_pool, budget_slug, user_id).await?;

    let category_data = category_data.into_inner();

    let category = match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.edit_category(
            category_id,
            budget_id,
            category_data.name.as_deref(),
            category_data.color.as_deref(),
        )
    })
    .await?
    {
        Ok(c) => c,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Category not found"),
                DoesNotExistType::Category,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to edit category",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(category))
}

pub async fn delete_category(
    db_thread_pool: web::Data<DbThreadPool>,
    path: web::Path<(String, Uuid)>,
    user_access_token: VerifiedToken<Access, FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let (budget_slug, category_id) = path.into_inner();
    let user_id = user_access_token.claims.user_id;

    let (budget_id, _) = membership::resolve(&db_thread_pool, budget_slug, user_id).await?;

    match web::block(move || {
        let budget_dao = db::budget::Dao::new(&db_thread_pool);
        budget_dao.delete_category(category_id, budget_id)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Category not found"),
                DoesNotExistType::Category,
            ));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "Category is referenced by existing purchases",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete category",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}
