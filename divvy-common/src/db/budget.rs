use chrono::{NaiveDateTime, Utc};
use diesel::{dsl, BelongingToDsl, ExpressionMethods, JoinOnDsl, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::budget::{Budget, NewBudget};
use crate::models::budget_invite::{BudgetInvite, NewBudgetInvite};
use crate::models::budget_member::{MemberRole, NewBudgetMember};
use crate::models::category::{Category, NewCategory};
use crate::request_io::{InputCategory, OutputBudget, OutputBudgetInvite, OutputBudgetMember};

use crate::schema::budget_invites as budget_invite_fields;
use crate::schema::budget_invites::dsl::budget_invites;
use crate::schema::budget_members as budget_member_fields;
use crate::schema::budget_members::dsl::budget_members;
use crate::schema::budgets as budget_fields;
use crate::schema::budgets::dsl::budgets;
use crate::schema::categories as category_fields;
use crate::schema::categories::dsl::categories;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_budget(
        &self,
        slug: &str,
        name: &str,
        budget_categories: &[InputCategory],
        owner_user_id: Uuid,
    ) -> Result<OutputBudget, DaoError> {
        let current_time = Utc::now().naive_utc();
        let budget_id = Uuid::now_v7();

        let new_budget = NewBudget {
            id: budget_id,
            slug,
            name,
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        let owner_membership = NewBudgetMember {
            budget_id,
            user_id: owner_user_id,
            role: MemberRole::Owner.into(),
            created_timestamp: current_time,
        };

        let new_categories = budget_categories
            .iter()
            .map(|category| NewCategory {
                id: Uuid::now_v7(),
                budget_id,
                name: &category.name,
                color: &category.color,
                created_timestamp: current_time,
                modified_timestamp: current_time,
            })
            .collect::<Vec<_>>();

        let mut db_connection = self.db_thread_pool.get()?;

        let output_budget = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                dsl::insert_into(budgets)
                    .values(&new_budget)
                    .execute(conn)?;

                dsl::insert_into(budget_members)
                    .values(&owner_membership)
                    .execute(conn)?;

                let created_categories = dsl::insert_into(categories)
                    .values(&new_categories)
                    .get_results::<Category>(conn)?;

                let (owner_email, owner_display_name) = users
                    .select((user_fields::email, user_fields::display_name))
                    .find(owner_user_id)
                    .get_result::<(String, String)>(conn)?;

                Ok(OutputBudget {
                    id: budget_id,
                    slug: String::from(slug),
                    name: String::from(name),
                    created_timestamp: current_time,
                    modified_timestamp: current_time,
                    members: vec![OutputBudgetMember {
                        user_id: owner_user_id,
                        email: owner_email,
                        display_name: owner_display_name,
                        role: MemberRole::Owner,
                        created_timestamp: current_time,
                    }],
                    categories: created_categories,
                })
            })?;

        Ok(output_budget)
    }

    pub fn get_budget_id_and_role(
        &self,
        budget_slug: &str,
        member_user_id: Uuid,
    ) -> Result<(Uuid, MemberRole), DaoError> {
        let (budget_id, role) = budgets
            .inner_join(budget_members)
            .select((budget_fields::id, budget_member_fields::role))
            .filter(budget_fields::slug.eq(budget_slug))
            .filter(budget_member_fields::user_id.eq(member_user_id))
            .get_result::<(Uuid, i16)>(&mut self.db_thread_pool.get()?)?;

        let role =
            MemberRole::from_i16(role).ok_or(DaoError::CannotRunQuery("Stored role is invalid"))?;

        Ok((budget_id, role))
    }

    pub fn get_role_in_budget(
        &self,
        budget_id: Uuid,
        member_user_id: Uuid,
    ) -> Result<MemberRole, DaoError> {
        let role = budget_members
            .select(budget_member_fields::role)
            .find((budget_id, member_user_id))
            .get_result::<i16>(&mut self.db_thread_pool.get()?)?;

        MemberRole::from_i16(role).ok_or(DaoError::CannotRunQuery("Stored role is invalid"))
    }

    pub fn get_output_budget(
        &self,
        budget_slug: &str,
        member_user_id: Uuid,
    ) -> Result<OutputBudget, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let output_budget = db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let budget = budgets
                    .inner_join(budget_members)
                    .select(budget_fields::all_columns)
                    .filter(budget_fields::slug.eq(budget_slug))
                    .filter(budget_member_fields::user_id.eq(member_user_id))
                    .get_result::<Budget>(conn)?;

                let member_rows = budget_members
                    .inner_join(users)
                    .select((
                        budget_member_fields::user_id,
                        budget_member_fields::role,
                        budget_member_fields::created_timestamp,
                        user_fields::email,
                        user_fields::display_name,
                    ))
                    .filter(budget_member_fields::budget_id.eq(budget.id))
                    .order((
                        budget_member_fields::created_timestamp.asc(),
                        budget_member_fields::user_id.asc(),
                    ))
                    .load::<(Uuid, i16, NaiveDateTime, String, String)>(conn)?;

                let mut members = Vec::with_capacity(member_rows.len());
                for (user_id, role, joined_timestamp, email, display_name) in member_rows {
                    let role = MemberRole::from_i16(role)
                        .ok_or(DaoError::CannotRunQuery("Stored role is invalid"))?;

                    members.push(OutputBudgetMember {
                        user_id,
                        email,
                        display_name,
                        role,
                        created_timestamp: joined_timestamp,
                    });
                }

                let budget_categories = Category::belonging_to(&budget)
                    .order(category_fields::name.asc())
                    .load::<Category>(conn)?;

                Ok(OutputBudget {
                    id: budget.id,
                    slug: budget.slug,
                    name: budget.name,
                    created_timestamp: budget.created_timestamp,
                    modified_timestamp: budget.modified_timestamp,
                    members,
                    categories: budget_categories,
                })
            })?;

        Ok(output_budget)
    }

    // Member ids in join order. Equal-split allocation iterates this ordering, so it must be
    // stable across calls.
    pub fn get_member_user_ids(&self, budget_id: Uuid) -> Result<Vec<Uuid>, DaoError> {
        Ok(budget_members
            .select(budget_member_fields::user_id)
            .filter(budget_member_fields::budget_id.eq(budget_id))
            .order((
                budget_member_fields::created_timestamp.asc(),
                budget_member_fields::user_id.asc(),
            ))
            .load::<Uuid>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn count_members_with_role(
        &self,
        budget_id: Uuid,
        role: MemberRole,
    ) -> Result<i64, DaoError> {
        Ok(budget_members
            .filter(budget_member_fields::budget_id.eq(budget_id))
            .filter(budget_member_fields::role.eq(i16::from(role)))
            .count()
            .get_result::<i64>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn invite_user(
        &self,
        budget_id: Uuid,
        sender_user_id: Uuid,
        recipient_user_id: Uuid,
        granted_role: MemberRole,
    ) -> Result<Uuid, DaoError> {
        let current_time = Utc::now().naive_utc();
        let invite_id = Uuid::now_v7();

        let new_invite = NewBudgetInvite {
            id: invite_id,
            budget_id,
            sender_user_id,
            recipient_user_id,
            granted_role: granted_role.into(),
            created_timestamp: current_time,
        };

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let existing_membership_count = budget_members
                    .find((budget_id, recipient_user_id))
                    .count()
                    .get_result::<i64>(conn)?;

                if existing_membership_count > 0 {
                    return Err(DaoError::WontRunQuery);
                }

                dsl::insert_into(budget_invites)
                    .values(&new_invite)
                    .execute(conn)?;

                Ok(())
            })?;

        Ok(invite_id)
    }

    pub fn get_invite(&self, invite_id: Uuid) -> Result<BudgetInvite, DaoError> {
        Ok(budget_invites
            .find(invite_id)
            .get_result::<BudgetInvite>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_invites_for_user(
        &self,
        recipient_user_id: Uuid,
    ) -> Result<Vec<OutputBudgetInvite>, DaoError> {
        let invite_rows = budget_invites
            .inner_join(budgets)
            .inner_join(users.on(user_fields::id.eq(budget_invite_fields::sender_user_id)))
            .select((
                budget_invite_fields::id,
                budget_invite_fields::budget_id,
                budget_fields::slug,
                budget_fields::name,
                user_fields::email,
                budget_invite_fields::granted_role,
                budget_invite_fields::created_timestamp,
            ))
            .filter(budget_invite_fields::recipient_user_id.eq(recipient_user_id))
            .order(budget_invite_fields::created_timestamp.asc())
            .load::<(Uuid, Uuid, String, String, String, i16, NaiveDateTime)>(
                &mut self.db_thread_pool.get()?,
            )?;

        let mut invites = Vec::with_capacity(invite_rows.len());
        for (invite_id, budget_id, budget_slug, budget_name, sender_email, role, created) in
            invite_rows
        {
            let role = MemberRole::from_i16(role)
                .ok_or(DaoError::CannotRunQuery("Stored role is invalid"))?;

            invites.push(OutputBudgetInvite {
                id: invite_id,
                budget_id,
                budget_slug,
                budget_name,
                sender_email,
                role,
                created_timestamp: created,
            });
        }

        Ok(invites)
    }

    pub fn accept_invite(
        &self,
        invite_id: Uuid,
        recipient_user_id: Uuid,
    ) -> Result<Uuid, DaoError> {
        let current_time = Utc::now().naive_utc();

        let mut db_connection = self.db_thread_pool.get()?;

        let budget_id = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let invite = budget_invites
                    .find(invite_id)
                    .filter(budget_invite_fields::recipient_user_id.eq(recipient_user_id))
                    .get_result::<BudgetInvite>(conn)?;

                let new_member = NewBudgetMember {
                    budget_id: invite.budget_id,
                    user_id: recipient_user_id,
                    role: invite.granted_role,
                    created_timestamp: current_time,
                };

                dsl::insert_into(budget_members)
                    .values(&new_member)
                    .execute(conn)?;

                diesel::delete(budget_invites.find(invite_id)).execute(conn)?;

                Ok(invite.budget_id)
            })?;

        Ok(budget_id)
    }

    pub fn decline_invite(
        &self,
        invite_id: Uuid,
        recipient_user_id: Uuid,
    ) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(
            budget_invites
                .find(invite_id)
                .filter(budget_invite_fields::recipient_user_id.eq(recipient_user_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    pub fn delete_invite(&self, invite_id: Uuid) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(budget_invites.find(invite_id))
            .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    pub fn delete_invites_older_than(&self, cutoff: NaiveDateTime) -> Result<usize, DaoError> {
        Ok(diesel::delete(
            budget_invites.filter(budget_invite_fields::created_timestamp.lt(cutoff)),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    pub fn set_member_role(
        &self,
        budget_id: Uuid,
        member_user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), DaoError> {
        let affected_row_count =
            dsl::update(budget_members.find((budget_id, member_user_id)))
                .set(budget_member_fields::role.eq(i16::from(role)))
                .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    pub fn remove_member(&self, budget_id: Uuid, member_user_id: Uuid) -> Result<(), DaoError> {
        let affected_row_count =
            diesel::delete(budget_members.find((budget_id, member_user_id)))
                .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    pub fn create_category(
        &self,
        budget_id: Uuid,
        name: &str,
        color: &str,
    ) -> Result<Category, DaoError> {
        let current_time = Utc::now().naive_utc();

        let new_category = NewCategory {
            id: Uuid::now_v7(),
            budget_id,
            name,
            color,
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        Ok(dsl::insert_into(categories)
            .values(&new_category)
            .get_result::<Category>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn edit_category(
        &self,
        category_id: Uuid,
        budget_id: Uuid,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Category, DaoError> {
        let current_time = Utc::now().naive_utc();

        Ok(dsl::update(
            categories
                .find(category_id)
                .filter(category_fields::budget_id.eq(budget_id)),
        )
        .set((
            name.map(|new_name| category_fields::name.eq(new_name)),
            color.map(|new_color| category_fields::color.eq(new_color)),
            category_fields::modified_timestamp.eq(current_time),
        ))
        .get_result::<Category>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_category(&self, category_id: Uuid, budget_id: Uuid) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(
            categories
                .find(category_id)
                .filter(category_fields::budget_id.eq(budget_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    pub fn get_categories(&self, budget_id: Uuid) -> Result<Vec<Category>, DaoError> {
        Ok(categories
            .filter(category_fields::budget_id.eq(budget_id))
            .order(category_fields::name.asc())
            .load::<Category>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn category_is_in_budget(
        &self,
        category_id: Uuid,
        budget_id: Uuid,
    ) -> Result<bool, DaoError> {
        let count = categories
            .find(category_id)
            .filter(category_fields::budget_id.eq(budget_id))
            .count()
            .get_result::<i64>(&mut self.db_thread_pool.get()?)?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    use crate::db::{test_utils, user};

    fn new_daos() -> (Dao, user::Dao) {
        (
            Dao::new(test_utils::db_thread_pool()),
            user::Dao::new(test_utils::db_thread_pool()),
        )
    }

    #[test]
    fn test_create_and_get_budget() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let outsider = test_utils::create_user(&user_dao);

        let input_categories = vec![
            InputCategory {
                name: String::from("Groceries"),
                color: String::from("#11aa22"),
            },
            InputCategory {
                name: String::from("Dining"),
                color: String::from("#aa1122"),
            },
        ];

        let slug = test_utils::unique_slug();
        let created = dao
            .create_budget(&slug, "Household", &input_categories, owner.id)
            .unwrap();

        assert_eq!(created.slug, slug);
        assert_eq!(created.members.len(), 1);
        assert_eq!(created.members[0].user_id, owner.id);
        assert_eq!(created.members[0].role, MemberRole::Owner);
        assert_eq!(created.categories.len(), 2);

        let fetched = dao.get_output_budget(&slug, owner.id).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, "Household");
        // Categories come back sorted by name
        assert_eq!(fetched.categories[0].name, "Dining");
        assert_eq!(fetched.categories[1].name, "Groceries");

        let result = dao.get_output_budget(&slug, outsider.id);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::NotFound))
        ));

        let (budget_id, role) = dao.get_budget_id_and_role(&slug, owner.id).unwrap();
        assert_eq!(budget_id, created.id);
        assert_eq!(role, MemberRole::Owner);

        test_utils::delete_budget(created.id);
        test_utils::delete_user(owner.id);
        test_utils::delete_user(outsider.id);
    }

    #[test]
    fn test_create_budget_with_duplicate_slug_fails() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);

        let slug = test_utils::unique_slug();
        let created = dao.create_budget(&slug, "First", &[], owner.id).unwrap();

        let result = dao.create_budget(&slug, "Second", &[], owner.id);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )))
        ));

        test_utils::delete_budget(created.id);
        test_utils::delete_user(owner.id);
    }

    #[test]
    fn test_invite_accept_lifecycle() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let recipient = test_utils::create_user(&user_dao);

        let budget_id = test_utils::create_budget_with_owner(&dao, owner.id);

        let invite_id = dao
            .invite_user(budget_id, owner.id, recipient.id, MemberRole::Member)
            .unwrap();

        let invites = dao.get_invites_for_user(recipient.id).unwrap();
        assert_eq!(invites.len(), 1);
        assert_eq!(invites[0].id, invite_id);
        assert_eq!(invites[0].budget_id, budget_id);
        assert_eq!(invites[0].sender_email, owner.email.to_lowercase());
        assert_eq!(invites[0].role, MemberRole::Member);

        let accepted_budget_id = dao.accept_invite(invite_id, recipient.id).unwrap();
        assert_eq!(accepted_budget_id, budget_id);

        let role = dao.get_role_in_budget(budget_id, recipient.id).unwrap();
        assert_eq!(role, MemberRole::Member);

        assert!(dao.get_invites_for_user(recipient.id).unwrap().is_empty());

        // Recipient is a member now, so a second invite is refused
        let result = dao.invite_user(budget_id, owner.id, recipient.id, MemberRole::Member);
        assert!(matches!(result, Err(DaoError::WontRunQuery)));

        test_utils::delete_budget(budget_id);
        test_utils::delete_user(owner.id);
        test_utils::delete_user(recipient.id);
    }

    #[test]
    fn test_accept_invite_for_other_recipient_fails() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let recipient = test_utils::create_user(&user_dao);
        let interloper = test_utils::create_user(&user_dao);

        let budget_id = test_utils::create_budget_with_owner(&dao, owner.id);
        let invite_id = dao
            .invite_user(budget_id, owner.id, recipient.id, MemberRole::Admin)
            .unwrap();

        let result = dao.accept_invite(invite_id, interloper.id);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::NotFound))
        ));

        // The invite is still pending for the real recipient
        assert_eq!(dao.get_invites_for_user(recipient.id).unwrap().len(), 1);

        test_utils::delete_budget(budget_id);
        test_utils::delete_user(owner.id);
        test_utils::delete_user(recipient.id);
        test_utils::delete_user(interloper.id);
    }

    #[test]
    fn test_decline_invite() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let recipient = test_utils::create_user(&user_dao);

        let budget_id = test_utils::create_budget_with_owner(&dao, owner.id);
        let invite_id = dao
            .invite_user(budget_id, owner.id, recipient.id, MemberRole::Member)
            .unwrap();

        dao.decline_invite(invite_id, recipient.id).unwrap();

        let result = dao.accept_invite(invite_id, recipient.id);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::NotFound))
        ));

        test_utils::delete_budget(budget_id);
        test_utils::delete_user(owner.id);
        test_utils::delete_user(recipient.id);
    }

    #[test]
    fn test_delete_invites_older_than() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let recipient = test_utils::create_user(&user_dao);

        let budget_id = test_utils::create_budget_with_owner(&dao, owner.id);
        let other_budget_id = test_utils::create_budget_with_owner(&dao, owner.id);

        let stale_invite_id = dao
            .invite_user(budget_id, owner.id, recipient.id, MemberRole::Member)
            .unwrap();
        let fresh_invite_id = dao
            .invite_user(other_budget_id, owner.id, recipient.id, MemberRole::Member)
            .unwrap();

        // Backdate one invite past the cutoff
        diesel::update(budget_invites.find(stale_invite_id))
            .set(
                budget_invite_fields::created_timestamp
                    .eq(Utc::now().naive_utc() - chrono::Duration::days(45)),
            )
            .execute(&mut test_utils::db_thread_pool().get().unwrap())
            .unwrap();

        let removed = dao
            .delete_invites_older_than(Utc::now().naive_utc() - chrono::Duration::days(30))
            .unwrap();
        assert!(removed >= 1);

        let remaining = dao.get_invites_for_user(recipient.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh_invite_id);

        test_utils::delete_budget(budget_id);
        test_utils::delete_budget(other_budget_id);
        test_utils::delete_user(owner.id);
        test_utils::delete_user(recipient.id);
    }

    #[test]
    fn test_duplicate_pending_invite_fails() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let recipient = test_utils::create_user(&user_dao);

        let budget_id = test_utils::create_budget_with_owner(&dao, owner.id);
        dao.invite_user(budget_id, owner.id, recipient.id, MemberRole::Member)
            .unwrap();

        let result = dao.invite_user(budget_id, owner.id, recipient.id, MemberRole::Admin);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )))
        ));

        test_utils::delete_budget(budget_id);
        test_utils::delete_user(owner.id);
        test_utils::delete_user(recipient.id);
    }

    #[test]
    fn test_set_member_role_and_remove_member() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let member = test_utils::create_user(&user_dao);

        let budget_id = test_utils::create_budget_with_owner(&dao, owner.id);
        let invite_id = dao
            .invite_user(budget_id, owner.id, member.id, MemberRole::Member)
            .unwrap();
        dao.accept_invite(invite_id, member.id).unwrap();

        dao.set_member_role(budget_id, member.id, MemberRole::Admin)
            .unwrap();
        assert_eq!(
            dao.get_role_in_budget(budget_id, member.id).unwrap(),
            MemberRole::Admin,
        );

        assert_eq!(
            dao.count_members_with_role(budget_id, MemberRole::Owner)
                .unwrap(),
            1,
        );

        dao.remove_member(budget_id, member.id).unwrap();
        let result = dao.get_role_in_budget(budget_id, member.id);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::NotFound))
        ));

        test_utils::delete_budget(budget_id);
        test_utils::delete_user(owner.id);
        test_utils::delete_user(member.id);
    }

    #[test]
    fn test_member_user_ids_are_in_join_order() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let second = test_utils::create_user(&user_dao);
        let third = test_utils::create_user(&user_dao);

        let budget_id = test_utils::create_budget_with_owner(&dao, owner.id);

        for joiner in [&second, &third] {
            let invite_id = dao
                .invite_user(budget_id, owner.id, joiner.id, MemberRole::Member)
                .unwrap();
            dao.accept_invite(invite_id, joiner.id).unwrap();
        }

        let member_ids = dao.get_member_user_ids(budget_id).unwrap();
        assert_eq!(member_ids.len(), 3);
        assert_eq!(member_ids[0], owner.id);

        test_utils::delete_budget(budget_id);
        test_utils::delete_user(owner.id);
        test_utils::delete_user(second.id);
        test_utils::delete_user(third.id);
    }

    #[test]
    fn test_category_crud() {
        let (dao, user_dao) = new_daos();
        let owner = test_utils::create_user(&user_dao);
        let budget_id = test_utils::create_budget_with_owner(&dao, owner.id);

        let category = dao
            .create_category(budget_id, "Utilities", "#123456")
            .unwrap();
        assert!(dao.category_is_in_budget(category.id, budget_id).unwrap());

        let edited = dao
            .edit_category(category.id, budget_id, Some("Bills"), None)
            .unwrap();
        assert_eq!(edited.name, "Bills");
        assert_eq!(edited.color, "#123456");

        dao.delete_category(category.id, budget_id).unwrap();
        assert!(!dao.category_is_in_budget(category.id, budget_id).unwrap());

        let result = dao.delete_category(category.id, budget_id);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::NotFound))
        ));

        test_utils::delete_budget(budget_id);
        test_utils::delete_user(owner.id);
    }
}
