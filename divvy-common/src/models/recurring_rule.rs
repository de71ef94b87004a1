use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::models::category::Category;
use crate::schema::recurring_rules;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    Expense,
    Income,
}

impl RuleKind {
    pub fn from_i16(value: i16) -> Option<RuleKind> {
        match value {
            0 => Some(RuleKind::Expense),
            1 => Some(RuleKind::Income),
            _ => None,
        }
    }
}

impl From<RuleKind> for i16 {
    fn from(kind: RuleKind) -> Self {
        match kind {
            RuleKind::Expense => 0,
            RuleKind::Income => 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(Budget, foreign_key = budget_id))]
#[diesel(belongs_to(Category, foreign_key = category_id))]
#[diesel(table_name = recurring_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecurringRule {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub kind: i16,
    pub category_id: Option<Uuid>,
    pub member_user_id: Uuid,
    pub item_name: String,
    pub amount_cents: i64,
    pub notes: Option<String>,
    pub recurrence_unit: i16,
    pub interval_count: i32,
    pub time_zone: String,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub next_run_at: NaiveDateTime,
    pub last_run_at: Option<NaiveDateTime>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_timestamp: NaiveDateTime,
    pub modified_timestamp: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = recurring_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewRecurringRule<'a> {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub kind: i16,
    pub category_id: Option<Uuid>,
    pub member_user_id: Uuid,
    pub item_name: &'a str,
    pub amount_cents: i64,
    pub notes: Option<&'a str>,
    pub recurrence_unit: i16,
    pub interval_count: i32,
    pub time_zone: &'a str,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub next_run_at: NaiveDateTime,
    pub last_run_at: Option<NaiveDateTime>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_timestamp: NaiveDateTime,
    pub modified_timestamp: NaiveDateTime,
}
