use chrono::{NaiveDateTime, Utc};
use diesel::{dsl, BelongingToDsl, ExpressionMethods, GroupedBy, JoinOnDsl, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::allocation::AllocatedShare;
use crate::db::recurring::{self, NewRuleSpec};
use crate::db::{DaoError, DbThreadPool};
use crate::models::budget_member::MemberRole;
use crate::models::purchase::{NewPurchase, Purchase};
use crate::models::purchase_share::{NewPurchaseShare, PurchaseShare};
use crate::models::recurring_rule::RuleKind;
use crate::request_io::{OutputCreatedPurchase, OutputPurchase, OutputRecurringRule};

use crate::schema::budget_members as budget_member_fields;
use crate::schema::budget_members::dsl::budget_members;
use crate::schema::purchase_shares as purchase_share_fields;
use crate::schema::purchase_shares::dsl::purchase_shares;
use crate::schema::purchases as purchase_fields;
use crate::schema::purchases::dsl::purchases;

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
    pub fn create_purchase(
        &self,
        budget_id: Uuid,
        category_id: Uuid,
        item_name: &str,
        amount_cents: i64,
        paid_at: NaiveDateTime,
        is_shared: bool,
        notes: Option<&str>,
        paid_by: Uuid,
        created_by: Uuid,
        shares: &[AllocatedShare],
        recurrence: Option<&NewRuleSpec>,
    ) -> Result<OutputCreatedPurchase, DaoError> {
        let current_time = Utc::now().naive_utc();
        let purchase_id = Uuid::now_v7();

        let new_purchase = NewPurchase {
            id: purchase_id,
            budget_id,
            category_id,
            item_name,
            amount_cents,
            paid_at,
            is_shared,
            notes,
            paid_by,
            created_by,
            is_deleted: false,
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        let new_shares = shares
            .iter()
            .map(|share| NewPurchaseShare {
                purchase_id,
                user_id: share.user_id,
                percent: share.percent,
                amount_cents: share.amount_cents,
                is_settled: false,
                settled_at: None,
            })
            .collect::<Vec<_>>();

        let mut db_connection = self.db_thread_pool.get()?;

        let (purchase, created_shares, rule) = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let purchase = dsl::insert_into(purchases)
                    .values(&new_purchase)
                    .get_result::<Purchase>(conn)?;

                let created_shares = dsl::insert_into(purchase_shares)
                    .values(&new_shares)
                    .get_results::<PurchaseShare>(conn)?;

                let rule = match recurrence {
                    Some(spec) => Some(recurring::insert_rule(
                        conn,
                        budget_id,
                        RuleKind::Expense,
                        Some(category_id),
                        paid_by,
                        item_name,
                        amount_cents,
                        notes,
                        spec,
                        created_by,
                        current_time,
                    )?),
                    None => None,
                };

                Ok((purchase, created_shares, rule))
            })?;

        let recurring_rule = match rule {
            Some(rule) => Some(
                OutputRecurringRule::from_rule(rule)
                    .ok_or(DaoError::CannotRunQuery("Stored rule fields are invalid"))?,
            ),
            None => None,
        };

        Ok(OutputCreatedPurchase {
            purchase: OutputPurchase::from_purchase_and_shares(purchase, created_shares),
            recurring_rule,
        })
    }

    pub fn get_purchases(
        &self,
        budget_id: Uuid,
        category_id: Option<Uuid>,
        date_from: Option<NaiveDateTime>,
        date_to: Option<NaiveDateTime>,
    ) -> Result<Vec<OutputPurchase>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let output_purchases = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let mut query = purchases
                    .filter(purchase_fields::budget_id.eq(budget_id))
                    .filter(purchase_fields::is_deleted.eq(false))
                    .into_boxed();

                if let Some(category_id) = category_id {
                    query = query.filter(purchase_fields::category_id.eq(category_id));
                }

                if let Some(date_from) = date_from {
                    query = query.filter(purchase_fields::paid_at.ge(date_from));
                }

                if let Some(date_to) = date_to {
                    query = query.filter(purchase_fields::paid_at.lt(date_to));
                }

                let loaded_purchases = query
                    .order((purchase_fields::paid_at.desc(), purchase_fields::id.desc()))
                    .load::<Purchase>(conn)?;

                let loaded_shares = PurchaseShare::belonging_to(&loaded_purchases)
                    .load::<PurchaseShare>(conn)?
                    .grouped_by(&loaded_purchases);

                Ok(loaded_purchases
                    .into_iter()
                    .zip(loaded_shares)
                    .map(|(purchase, shares)| {
                        OutputPurchase::from_purchase_and_shares(purchase, shares)
                    })
                    .collect())
            })?;

        Ok(output_purchases)
    }

    pub fn get_purchase(
        &self,
        purchase_id: Uuid,
        member_user_id: Uuid,
    ) -> Result<OutputPurchase, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let output_purchase = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let purchase = purchases
                    .inner_join(
                        budget_members
                            .on(budget_member_fields::budget_id.eq(purchase_fields::budget_id)),
                    )
                    .select(purchase_fields::all_columns)
                    .filter(purchase_fields::id.eq(purchase_id))
                    .filter(purchase_fields::is_deleted.eq(false))
                    .filter(budget_member_fields::user_id.eq(member_user_id))
                    .get_result::<Purchase>(conn)?;

                let loaded_shares =
                    PurchaseShare::belonging_to(&purchase).load::<PurchaseShare>(conn)?;

                Ok(OutputPurchase::from_purchase_and_shares(
                    purchase,
                    loaded_shares,
                ))
            })?;

        Ok(output_purchase)
    }

    pub fn set_settled(
        &self,
        purchase_id: Uuid,
        member_user_id: Uuid,
        settled: bool,
    ) -> Result<OutputPurchase, DaoError> {
        let current_time = Utc::now().naive_utc();
        let settled_at_value = if settled { Some(current_time) } else { None };

        let mut db_connection = self.db_thread_pool.get()?;

        let output_purchase = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let purchase = purchases
                    .inner_join(
                        budget_members
                            .on(budget_member_fields::budget_id.eq(purchase_fields::budget_id)),
                    )
                    .select(purchase_fields::all_columns)
                    .filter(purchase_fields::id.eq(purchase_id))
                    .filter(purchase_fields::is_deleted.eq(false))
                    .filter(budget_member_fields::user_id.eq(member_user_id))
                    .get_result::<Purchase>(conn)?;

                // Only shares owed by someone other than the payer carry debt
                dsl::update(
                    purchase_shares
                        .filter(purchase_share_fields::purchase_id.eq(purchase_id))
                        .filter(purchase_share_fields::user_id.ne(purchase.paid_by))
                        .filter(purchase_share_fields::percent.gt(0)),
                )
                .set((
                    purchase_share_fields::is_settled.eq(settled),
                    purchase_share_fields::settled_at.eq(settled_at_value),
                ))
                .execute(conn)?;

                let loaded_shares =
                    PurchaseShare::belonging_to(&purchase).load::<PurchaseShare>(conn)?;

                Ok(OutputPurchase::from_purchase_and_shares(
                    purchase,
                    loaded_shares,
                ))
            })?;

        Ok(output_purchase)
    }

    pub fn soft_delete_purchase(
        &self,
        purchase_id: Uuid,
        member_user_id: Uuid,
    ) -> Result<(), DaoError> {
        let current_time = Utc::now().naive_utc();

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let (paid_by, created_by, caller_role) = purchases
                    .inner_join(
                        budget_members
                            .on(budget_member_fields::budget_id.eq(purchase_fields::budget_id)),
                    )
                    .select((
                        purchase_fields::paid_by,
                        purchase_fields::created_by,
                        budget_member_fields::role,
                    ))
                    .filter(purchase_fields::id.eq(purchase_id))
                    .filter(purchase_fields::is_deleted.eq(false))
                    .filter(budget_member_fields::user_id.eq(member_user_id))
                    .get_result::<(Uuid, Uuid, i16)>(conn)?;

                let caller_role = MemberRole::from_i16(caller_role)
                    .ok_or(DaoError::CannotRunQuery("Stored role is invalid"))?;

                let caller_may_delete = member_user_id == created_by
                    || member_user_id == paid_by
                    || caller_role.has_admin_privileges();

                if !caller_may_delete {
                    return Err(DaoError::WontRunQuery);
                }

                dsl::update(purchases.find(purchase_id))
                    .set((
                        purchase_fields::is_deleted.eq(true),
                        purchase_fields::modified_timestamp.eq(current_time),
                    ))
                    .execute(conn)?;

                Ok(())
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::SubsecRound;
    use diesel::result::Error as DieselError;

    use crate::allocation::{self, SplitMode};
    use crate::db::test_utils::{self, InsertedTestUser};
    use crate::db::{budget, user};
    use crate::recurrence::RecurrenceUnit;

    fn budget_with_members(member_count: usize) -> (Uuid, Uuid, Vec<InsertedTestUser>) {
        let budget_dao = budget::Dao::new(test_utils::db_thread_pool());
        let user_dao = user::Dao::new(test_utils::db_thread_pool());

        let mut members = Vec::with_capacity(member_count);
        members.push(test_utils::create_user(&user_dao));

        let budget_id = test_utils::create_budget_with_owner(&budget_dao, members[0].id);

        for _ in 1..member_count {
            let joiner = test_utils::create_user(&user_dao);
            let invite_id = budget_dao
                .invite_user(budget_id, members[0].id, joiner.id, MemberRole::Member)
                .unwrap();
            budget_dao.accept_invite(invite_id, joiner.id).unwrap();
            members.push(joiner);
        }

        let category_id = budget_dao.get_categories(budget_id).unwrap()[0].id;

        (budget_id, category_id, members)
    }

    fn clean_up(budget_id: Uuid, members: &[InsertedTestUser]) {
        test_utils::delete_budget(budget_id);
        for member in members {
            test_utils::delete_user(member.id);
        }
    }

    #[test]
    fn test_create_purchase_with_equal_split() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let (budget_id, category_id, members) = budget_with_members(3);

        let roster = members.iter().map(|m| m.id).collect::<Vec<_>>();
        let shares = allocation::allocate(100, roster[0], &roster, &SplitMode::EqualSplit).unwrap();

        let created = dao
            .create_purchase(
                budget_id,
                category_id,
                "Groceries run",
                100,
                Utc::now().naive_utc(),
                true,
                None,
                roster[0],
                roster[0],
                &shares,
                None,
            )
            .unwrap();

        assert_eq!(created.purchase.shares.len(), 3);
        assert_eq!(
            created
                .purchase
                .shares
                .iter()
                .map(|s| s.amount_cents)
                .sum::<i64>(),
            100,
        );
        assert_eq!(
            created
                .purchase
                .shares
                .iter()
                .map(|s| s.percent)
                .sum::<i32>(),
            100,
        );
        assert!(created.recurring_rule.is_none());

        let listed = dao.get_purchases(budget_id, None, None, None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.purchase.id);

        clean_up(budget_id, &members);
    }

    #[test]
    fn test_create_purchase_with_two_party_split() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let (budget_id, category_id, members) = budget_with_members(2);

        let roster = members.iter().map(|m| m.id).collect::<Vec<_>>();
        let shares = allocation::allocate(
            50,
            roster[0],
            &roster,
            &SplitMode::TwoParty {
                payer_percent: 70.0,
            },
        )
        .unwrap();

        let created = dao
            .create_purchase(
                budget_id,
                category_id,
                "Takeout",
                50,
                Utc::now().naive_utc(),
                true,
                Some("Friday night"),
                roster[0],
                roster[0],
                &shares,
                None,
            )
            .unwrap();

        let payer_share = created
            .purchase
            .shares
            .iter()
            .find(|s| s.user_id == roster[0])
            .unwrap();
        let other_share = created
            .purchase
            .shares
            .iter()
            .find(|s| s.user_id == roster[1])
            .unwrap();

        assert_eq!(payer_share.percent, 70);
        assert_eq!(payer_share.amount_cents, 35);
        assert_eq!(other_share.percent, 30);
        assert_eq!(other_share.amount_cents, 15);

        clean_up(budget_id, &members);
    }

    #[test]
    fn test_create_purchase_with_recurrence() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let (budget_id, category_id, members) = budget_with_members(1);

        let roster = vec![members[0].id];
        let shares = allocation::allocate(1299, roster[0], &roster, &SplitMode::Personal).unwrap();

        // Whole seconds survive the round trip through Postgres's
        // microsecond-precision columns
        let start_at = (Utc::now().naive_utc() + chrono::Duration::days(3)).trunc_subsecs(0);
        let spec = NewRuleSpec {
            recurrence_unit: RecurrenceUnit::Monthly,
            interval_count: 1,
            time_zone: "UTC",
            start_at,
            end_at: None,
            next_run_at: start_at,
        };

        let created = dao
            .create_purchase(
                budget_id,
                category_id,
                "Streaming subscription",
                1299,
                Utc::now().naive_utc(),
                false,
                None,
                roster[0],
                roster[0],
                &shares,
                Some(&spec),
            )
            .unwrap();

        let rule = created.recurring_rule.unwrap();
        assert_eq!(rule.kind, RuleKind::Expense);
        assert_eq!(rule.recurrence, RecurrenceUnit::Monthly);
        assert_eq!(rule.next_run_at, start_at);
        assert_eq!(rule.category_id, Some(category_id));
        assert!(rule.is_active);

        clean_up(budget_id, &members);
    }

    #[test]
    fn test_get_purchase_requires_membership() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let user_dao = user::Dao::new(test_utils::db_thread_pool());
        let (budget_id, category_id, members) = budget_with_members(1);
        let outsider = test_utils::create_user(&user_dao);

        let roster = vec![members[0].id];
        let shares = allocation::allocate(500, roster[0], &roster, &SplitMode::Personal).unwrap();

        let created = dao
            .create_purchase(
                budget_id,
                category_id,
                "Coffee",
                500,
                Utc::now().naive_utc(),
                false,
                None,
                roster[0],
                roster[0],
                &shares,
                None,
            )
            .unwrap();

        assert!(dao.get_purchase(created.purchase.id, members[0].id).is_ok());

        let result = dao.get_purchase(created.purchase.id, outsider.id);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::NotFound))
        ));

        test_utils::delete_user(outsider.id);
        clean_up(budget_id, &members);
    }

    #[test]
    fn test_set_settled_flips_only_debtor_shares() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let (budget_id, category_id, members) = budget_with_members(2);

        let roster = members.iter().map(|m| m.id).collect::<Vec<_>>();
        let shares = allocation::allocate(100, roster[0], &roster, &SplitMode::EqualSplit).unwrap();

        let created = dao
            .create_purchase(
                budget_id,
                category_id,
                "Utilities",
                100,
                Utc::now().naive_utc(),
                true,
                None,
                roster[0],
                roster[0],
                &shares,
                None,
            )
            .unwrap();

        let settled = dao
            .set_settled(created.purchase.id, roster[1], true)
            .unwrap();

        let payer_share = settled.shares.iter().find(|s| s.user_id == roster[0]).unwrap();
        let debtor_share = settled.shares.iter().find(|s| s.user_id == roster[1]).unwrap();

        assert!(!payer_share.is_settled);
        assert!(payer_share.settled_at.is_none());
        assert!(debtor_share.is_settled);
        assert!(debtor_share.settled_at.is_some());

        let unsettled = dao
            .set_settled(created.purchase.id, roster[0], false)
            .unwrap();
        let debtor_share = unsettled
            .shares
            .iter()
            .find(|s| s.user_id == roster[1])
            .unwrap();
        assert!(!debtor_share.is_settled);
        assert!(debtor_share.settled_at.is_none());

        clean_up(budget_id, &members);
    }

    #[test]
    fn test_soft_delete_permissions() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let (budget_id, category_id, members) = budget_with_members(3);

        let roster = members.iter().map(|m| m.id).collect::<Vec<_>>();
        let shares = allocation::allocate(900, roster[1], &roster, &SplitMode::EqualSplit).unwrap();

        // Created and paid by the second member
        let created = dao
            .create_purchase(
                budget_id,
                category_id,
                "Concert tickets",
                900,
                Utc::now().naive_utc(),
                true,
                None,
                roster[1],
                roster[1],
                &shares,
                None,
            )
            .unwrap();

        // A plain member who neither created nor paid may not delete
        let result = dao.soft_delete_purchase(created.purchase.id, roster[2]);
        assert!(matches!(result, Err(DaoError::WontRunQuery)));

        // The payer may
        dao.soft_delete_purchase(created.purchase.id, roster[1])
            .unwrap();

        assert!(dao
            .get_purchases(budget_id, None, None, None)
            .unwrap()
            .is_empty());

        let result = dao.get_purchase(created.purchase.id, roster[1]);
        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(DieselError::NotFound))
        ));

        clean_up(budget_id, &members);
    }

    #[test]
    fn test_get_purchases_with_filters() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let (budget_id, category_id, members) = budget_with_members(1);
        let budget_dao = budget::Dao::new(test_utils::db_thread_pool());

        let other_category = budget_dao
            .create_category(budget_id, "Travel", "#336699")
            .unwrap();

        let roster = vec![members[0].id];
        let old_paid_at = Utc::now().naive_utc() - chrono::Duration::days(40);
        let recent_paid_at = Utc::now().naive_utc();

        for (name, cat, paid_at) in [
            ("Old groceries", category_id, old_paid_at),
            ("Flight", other_category.id, recent_paid_at),
            ("New groceries", category_id, recent_paid_at),
        ] {
            let shares = allocation::allocate(100, roster[0], &roster, &SplitMode::Personal).unwrap();
            dao.create_purchase(
                budget_id,
                cat,
                name,
                100,
                paid_at,
                false,
                None,
                roster[0],
                roster[0],
                &shares,
                None,
            )
            .unwrap();
        }

        let all = dao.get_purchases(budget_id, None, None, None).unwrap();
        assert_eq!(all.len(), 3);
        // Newest first
        assert_eq!(all[2].item_name, "Old groceries");

        let groceries_only = dao
            .get_purchases(budget_id, Some(category_id), None, None)
            .unwrap();
        assert_eq!(groceries_only.len(), 2);

        let recent_only = dao
            .get_purchases(
                budget_id,
                None,
                Some(Utc::now().naive_utc() - chrono::Duration::days(7)),
                None,
            )
            .unwrap();
        assert_eq!(recent_only.len(), 2);

        clean_up(budget_id, &members);
    }
}
