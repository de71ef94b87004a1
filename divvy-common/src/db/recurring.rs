use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::{
    dsl, BoolExpressionMethods, ExpressionMethods, JoinOnDsl, QueryDsl, RunQueryDsl,
};
use uuid::Uuid;

use crate::allocation::{self, SplitMode};
use crate::db::{DaoError, DbThreadPool};
use crate::models::income::NewIncome;
use crate::models::purchase::NewPurchase;
use crate::models::purchase_share::NewPurchaseShare;
use crate::models::recurring_rule::{NewRecurringRule, RecurringRule, RuleKind};
use crate::recurrence::{self, RecurrenceUnit};
use crate::request_io::OutputRecurringRule;

use crate::schema::budget_members as budget_member_fields;
use crate::schema::budget_members::dsl::budget_members;
use crate::schema::incomes::dsl::incomes;
use crate::schema::purchase_shares::dsl::purchase_shares;
use crate::schema::purchases::dsl::purchases;
use crate::schema::recurring_rules as recurring_rule_fields;
use crate::schema::recurring_rules::dsl::recurring_rules;

pub struct NewRuleSpec<'a> {
    pub recurrence_unit: RecurrenceUnit,
    pub interval_count: i32,
    pub time_zone: &'a str,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub next_run_at: NaiveDateTime,
}

impl<'a> From<&'a recurrence::ResolvedRecurrence> for NewRuleSpec<'a> {
    fn from(resolved: &'a recurrence::ResolvedRecurrence) -> Self {
        NewRuleSpec {
            recurrence_unit: resolved.unit,
            interval_count: resolved.interval,
            time_zone: &resolved.time_zone,
            start_at: resolved.start_at,
            end_at: resolved.end_at,
            next_run_at: resolved.next_run_at,
        }
    }
}

pub(crate) fn insert_rule(
    conn: &mut PgConnection,
    budget_id: Uuid,
    kind: RuleKind,
    category_id: Option<Uuid>,
    member_user_id: Uuid,
    item_name: &str,
    amount_cents: i64,
    notes: Option<&str>,
    spec: &NewRuleSpec,
    created_by: Uuid,
    current_time: NaiveDateTime,
) -> Result<RecurringRule, diesel::result::Error> {
    let new_rule = NewRecurringRule {
        id: Uuid::now_v7(),
        budget_id,
        kind: kind.into(),
        category_id,
        member_user_id,
        item_name,
        amount_cents,
        notes,
        recurrence_unit: spec.recurrence_unit.into(),
        interval_count: spec.interval_count.max(1),
        time_zone: spec.time_zone,
        start_at: spec.start_at,
        end_at: spec.end_at,
        next_run_at: spec.next_run_at,
        last_run_at: None,
        is_active: true,
        created_by,
        created_timestamp: current_time,
        modified_timestamp: current_time,
    };

    dsl::insert_into(recurring_rules)
        .values(&new_rule)
        .get_result::<RecurringRule>(conn)
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn get_rules(&self, budget_id: Uuid) -> Result<Vec<OutputRecurringRule>, DaoError> {
        let rules = recurring_rules
            .filter(recurring_rule_fields::budget_id.eq(budget_id))
            .order((
                recurring_rule_fields::next_run_at.asc(),
                recurring_rule_fields::id.asc(),
            ))
            .load::<RecurringRule>(&mut self.db_thread_pool.get()?)?;

        rules
            .into_iter()
            .map(|rule| {
                OutputRecurringRule::from_rule(rule)
                    .ok_or(DaoError::CannotRunQuery("Stored rule fields are invalid"))
            })
            .collect()
    }

    pub fn set_active(
        &self,
        rule_id: Uuid,
        member_user_id: Uuid,
        active: bool,
    ) -> Result<OutputRecurringRule, DaoError> {
        let current_time = Utc::now().naive_utc();

        let mut db_connection = self.db_thread_pool.get()?;

        let rule = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                recurring_rules
                    .inner_join(
                        budget_members.on(
                            budget_member_fields::budget_id.eq(recurring_rule_fields::budget_id),
                        ),
                    )
                    .select(recurring_rule_fields::id)
                    .filter(recurring_rule_fields::id.eq(rule_id))
                    .filter(budget_member_fields::user_id.eq(member_user_id))
                    .get_result::<Uuid>(conn)?;

                dsl::update(recurring_rules.find(rule_id))
                    .set((
                        recurring_rule_fields::is_active.eq(active),
                        recurring_rule_fields::modified_timestamp.eq(current_time),
                    ))
                    .get_result::<RecurringRule>(conn)
            })?;

        OutputRecurringRule::from_rule(rule)
            .ok_or(DaoError::CannotRunQuery("Stored rule fields are invalid"))
    }

    /// Materializes every due rule of the given kind for a budget in one transaction.
    ///
    /// Each due rule produces exactly one record dated at the rule's scheduled time, then
    /// the rule's schedule is advanced past `now`. The whole batch rolls back if any rule
    /// was advanced concurrently.
    pub fn run_due_rules(
        &self,
        budget_id: Uuid,
        kind: RuleKind,
        invoked_by: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<Vec<Uuid>, DaoError> {
        let current_time = Utc::now().naive_utc();

        let mut db_connection = self.db_thread_pool.get()?;

        let created_ids = db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let due_rules = recurring_rules
                    .filter(recurring_rule_fields::budget_id.eq(budget_id))
                    .filter(recurring_rule_fields::kind.eq(i16::from(kind)))
                    .filter(recurring_rule_fields::is_active.eq(true))
                    .filter(recurring_rule_fields::next_run_at.le(now))
                    .filter(
                        recurring_rule_fields::end_at
                            .is_null()
                            .or(recurring_rule_fields::end_at.ge(now)),
                    )
                    .order((
                        recurring_rule_fields::next_run_at.asc(),
                        recurring_rule_fields::id.asc(),
                    ))
                    .load::<RecurringRule>(conn)?;

                if due_rules.is_empty() {
                    return Ok(Vec::new());
                }

                let member_ids = budget_members
                    .select(budget_member_fields::user_id)
                    .filter(budget_member_fields::budget_id.eq(budget_id))
                    .order((
                        budget_member_fields::created_timestamp.asc(),
                        budget_member_fields::user_id.asc(),
                    ))
                    .load::<Uuid>(conn)?;

                let mut created_ids = Vec::with_capacity(due_rules.len());

                for rule in due_rules {
                    let occurred_at = rule.next_run_at;
                    let created_by = invoked_by.unwrap_or(rule.created_by);

                    let record_id = match kind {
                        RuleKind::Expense => materialize_purchase(
                            conn,
                            &rule,
                            &member_ids,
                            occurred_at,
                            created_by,
                            current_time,
                        )?,
                        RuleKind::Income => {
                            materialize_income(conn, &rule, occurred_at, created_by, current_time)?
                        }
                    };

                    let unit = RecurrenceUnit::from_i16(rule.recurrence_unit).ok_or(
                        DaoError::CannotRunQuery("Stored recurrence unit is invalid"),
                    )?;
                    let advanced_to =
                        recurrence::advance_past(occurred_at, now, unit, rule.interval_count)
                            .ok_or(DaoError::CannotRunQuery(
                                "Rule schedule advanced beyond the supported calendar range",
                            ))?;

                    let affected_row_count = dsl::update(
                        recurring_rules
                            .find(rule.id)
                            .filter(recurring_rule_fields::next_run_at.eq(occurred_at)),
                    )
                    .set((
                        recurring_rule_fields::next_run_at.eq(advanced_to),
                        recurring_rule_fields::last_run_at.eq(Some(occurred_at)),
                        recurring_rule_fields::modified_timestamp.eq(current_time),
                    ))
                    .execute(conn)?;

                    // Zero rows means another runner advanced this rule after it was selected
                    if affected_row_count == 0 {
                        return Err(DaoError::OutOfDate);
                    }

                    created_ids.push(record_id);
                }

                Ok(created_ids)
            })?;

        Ok(created_ids)
    }

    pub fn budgets_with_due_rules(&self, now: NaiveDateTime) -> Result<Vec<Uuid>, DaoError> {
        Ok(recurring_rules
            .select(recurring_rule_fields::budget_id)
            .distinct()
            .filter(recurring_rule_fields::is_active.eq(true))
            .filter(recurring_rule_fields::next_run_at.le(now))
            .filter(
                recurring_rule_fields::end_at
                    .is_null()
                    .or(recurring_rule_fields::end_at.ge(now)),
            )
            .load::<Uuid>(&mut self.db_thread_pool.get()?)?)
    }
}

fn materialize_purchase(
    conn: &mut PgConnection,
    rule: &RecurringRule,
    member_ids: &[Uuid],
    occurred_at: NaiveDateTime,
    created_by: Uuid,
    current_time: NaiveDateTime,
) -> Result<Uuid, DaoError> {
    let category_id = rule
        .category_id
        .ok_or(DaoError::CannotRunQuery("Expense rule has no category"))?;

    let payer_id = rule.member_user_id;

    // Fall back to a personal share when the stored payer is the only member or has
    // left the budget
    let (shares, is_shared) = if member_ids.len() > 1 && member_ids.contains(&payer_id) {
        let shares =
            allocation::allocate(rule.amount_cents, payer_id, member_ids, &SplitMode::EqualSplit)
                .map_err(|_| DaoError::CannotRunQuery("Could not allocate shares for a rule"))?;
        (shares, true)
    } else {
        let shares =
            allocation::allocate(rule.amount_cents, payer_id, &[payer_id], &SplitMode::Personal)
                .map_err(|_| DaoError::CannotRunQuery("Could not allocate shares for a rule"))?;
        (shares, false)
    };

    let purchase_id = Uuid::now_v7();

    let new_purchase = NewPurchase {
        id: purchase_id,
        budget_id: rule.budget_id,
        category_id,
        item_name: &rule.item_name,
        amount_cents: rule.amount_cents,
        paid_at: occurred_at,
        is_shared,
        notes: rule.notes.as_deref(),
        paid_by: payer_id,
        created_by,
        is_deleted: false,
        created_timestamp: current_time,
        modified_timestamp: current_time,
    };

    dsl::insert_into(purchases)
        .values(&new_purchase)
        .execute(conn)?;

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

    dsl::insert_into(purchase_shares)
        .values(&new_shares)
        .execute(conn)?;

    Ok(purchase_id)
}

fn materialize_income(
    conn: &mut PgConnection,
    rule: &RecurringRule,
    occurred_at: NaiveDateTime,
    created_by: Uuid,
    current_time: NaiveDateTime,
) -> Result<Uuid, DaoError> {
    let income_id = Uuid::now_v7();

    let new_income = NewIncome {
        id: income_id,
        budget_id: rule.budget_id,
        item_name: &rule.item_name,
        amount_cents: rule.amount_cents,
        received_at: occurred_at,
        notes: rule.notes.as_deref(),
        received_by: rule.member_user_id,
        created_by,
        is_deleted: false,
        created_timestamp: current_time,
        modified_timestamp: current_time,
    };

    dsl::insert_into(incomes)
        .values(&new_income)
        .execute(conn)?;

    Ok(income_id)
}
