use chrono::{NaiveDateTime, Utc};
use diesel::{dsl, ExpressionMethods, JoinOnDsl, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::db::recurring::{self, NewRuleSpec};
use crate::db::{DaoError, DbThreadPool};
use crate::models::budget_member::MemberRole;
use crate::models::income::{Income, NewIncome};
use crate::models::recurring_rule::RuleKind;
use crate::request_io::{OutputCreatedIncome, OutputRecurringRule};

use crate::schema::budget_members as budget_member_fields;
use crate::schema::budget_members::dsl::budget_members;
use crate::schema::incomes as income_fields;
use crate::schema::incomes::dsl::incomes;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_income(
        &self,
        budget_id: Uuid,
        item_name: &str,
        amount_cents: i64,
        received_at: NaiveDateTime,
        notes: Option<&str>,
        received_by: Uuid,
        created_by: Uuid,
        recurrence: Option<&NewRuleSpec>,
    ) -> Result<OutputCreatedIncome, DaoError> {
        let current_time = Utc::now().naive_utc();
        let income_id = Uuid::now_v7();

        let new_income = NewIncome {
            id: income_id,
            budget_id,
            item_name,
            amount_cents,
            received_at,
            notes,
            received_by,
            created_by,
            is_deleted: false,
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        let mut db_connection = self.db_thread_pool.get()?;

        let (income, rule) = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let income = dsl::insert_into(incomes)
                    .values(&new_income)
                    .get_result::<Income>(conn)?;

                let rule = match recurrence {
                    Some(spec) => Some(recurring::insert_rule(
                        conn,
                        budget_id,
                        RuleKind::Income,
                        None,
                        received_by,
                        item_name,
                        amount_cents,
                        notes,
                        spec,
                        created_by,
                        current_time,
                    )?),
                    None => None,
                };

                Ok((income, rule))
            })?;

        let recurring_rule = match rule {
            Some(rule) => Some(
                OutputRecurringRule::from_rule(rule)
                    .ok_or(DaoError::CannotRunQuery("Stored rule fields are invalid"))?,
            ),
            None => None,
        };

        Ok(OutputCreatedIncome {
            income,
            recurring_rule,
        })
    }

    pub fn get_incomes(&self, budget_id: Uuid) -> Result<Vec<Income>, DaoError> {
        Ok(incomes
            .filter(income_fields::budget_id.eq(budget_id))
            .filter(income_fields::is_deleted.eq(false))
            .order((income_fields::received_at.desc(), income_fields::id.desc()))
            .load::<Income>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn soft_delete_income(
        &self,
        income_id: Uuid,
        member_user_id: Uuid,
    ) -> Result<(), DaoError> {
        let current_time = Utc::now().naive_utc();

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let (received_by, created_by, caller_role) = incomes
                    .inner_join(
                        budget_members
                            .on(budget_member_fields::budget_id.eq(income_fields::budget_id)),
                    )
                    .select((
                        income_fields::received_by,
                        income_fields::created_by,
                        budget_member_fields::role,
                    ))
                    .filter(income_fields::id.eq(income_id))
                    .filter(income_fields::is_deleted.eq(false))
                    .filter(budget_member_fields::user_id.eq(member_user_id))
                    .get_result::<(Uuid, Uuid, i16)>(conn)?;

                let caller_role = MemberRole::from_i16(caller_role)
                    .ok_or(DaoError::CannotRunQuery("Stored role is invalid"))?;

                let caller_may_delete = member_user_id == created_by
                    || member_user_id == received_by
                    || caller_role.has_admin_privileges();

                if !caller_may_delete {
                    return Err(DaoError::WontRunQuery);
                }

                dsl::update(incomes.find(income_id))
                    .set((
                        income_fields::is_deleted.eq(true),
                        income_fields::modified_timestamp.eq(current_time),
                    ))
                    .execute(conn)?;

                Ok(())
            })?;

        Ok(())
    }
}
