use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::budget_member::MemberRole;
use crate::models::category::Category;
use crate::models::income::Income;
use crate::models::purchase::Purchase;
use crate::models::purchase_share::PurchaseShare;
use crate::models::recurring_rule::{RecurringRule, RuleKind};
use crate::recurrence::RecurrenceUnit;
use crate::reports::{DateWindow, DebtPair, NetBalance, PayerTotal, TrendChange};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub server_time: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub created_timestamp: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputBudgetMember {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: MemberRole,
    pub created_timestamp: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputBudget {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_timestamp: NaiveDateTime,
    pub modified_timestamp: NaiveDateTime,
    pub members: Vec<OutputBudgetMember>,
    pub categories: Vec<Category>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputBudgetInvite {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub budget_slug: String,
    pub budget_name: String,
    pub sender_email: String,
    pub role: MemberRole,
    pub created_timestamp: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputPurchase {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub item_name: String,
    pub amount_cents: i64,
    pub paid_at: NaiveDateTime,
    pub is_shared: bool,
    pub notes: Option<String>,
    pub paid_by: Uuid,
    pub created_by: Uuid,
    pub shares: Vec<PurchaseShare>,
    pub created_timestamp: NaiveDateTime,
    pub modified_timestamp: NaiveDateTime,
}

impl OutputPurchase {
    pub fn from_purchase_and_shares(purchase: Purchase, shares: Vec<PurchaseShare>) -> Self {
        OutputPurchase {
            id: purchase.id,
            budget_id: purchase.budget_id,
            category_id: purchase.category_id,
            item_name: purchase.item_name,
            amount_cents: purchase.amount_cents,
            paid_at: purchase.paid_at,
            is_shared: purchase.is_shared,
            notes: purchase.notes,
            paid_by: purchase.paid_by,
            created_by: purchase.created_by,
            shares,
            created_timestamp: purchase.created_timestamp,
            modified_timestamp: purchase.modified_timestamp,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRecurringRule {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub kind: RuleKind,
    pub category_id: Option<Uuid>,
    pub member_user_id: Uuid,
    pub item_name: String,
    pub amount_cents: i64,
    pub notes: Option<String>,
    pub recurrence: RecurrenceUnit,
    pub interval: i32,
    pub time_zone: String,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub next_run_at: NaiveDateTime,
    pub last_run_at: Option<NaiveDateTime>,
    pub is_active: bool,
}

impl OutputRecurringRule {
    /// Returns `None` when the stored kind or recurrence unit does not map
    /// to a known variant.
    pub fn from_rule(rule: RecurringRule) -> Option<Self> {
        Some(OutputRecurringRule {
            id: rule.id,
            budget_id: rule.budget_id,
            kind: RuleKind::from_i16(rule.kind)?,
            category_id: rule.category_id,
            member_user_id: rule.member_user_id,
            item_name: rule.item_name,
            amount_cents: rule.amount_cents,
            notes: rule.notes,
            recurrence: RecurrenceUnit::from_i16(rule.recurrence_unit)?,
            interval: rule.interval_count,
            time_zone: rule.time_zone,
            start_at: rule.start_at,
            end_at: rule.end_at,
            next_run_at: rule.next_run_at,
            last_run_at: rule.last_run_at,
            is_active: rule.is_active,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputCreatedPurchase {
    pub purchase: OutputPurchase,
    pub recurring_rule: Option<OutputRecurringRule>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputCreatedIncome {
    pub income: Income,
    pub recurring_rule: Option<OutputRecurringRule>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputRunDuePurchases {
    pub created_count: usize,
    pub purchase_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputRunDueIncomes {
    pub created_count: usize,
    pub income_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputCurrentBalance {
    pub payer_totals: Vec<PayerTotal>,
    pub pairs: Vec<DebtPair>,
    pub net_between_two_users: Option<NetBalance>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputCategoryTotalItem {
    pub category_id: Uuid,
    pub name: String,
    pub color: String,
    pub total_cents: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputCategoryTotals {
    pub items: Vec<OutputCategoryTotalItem>,
    pub grand_total_cents: i64,
    pub range: DateWindow,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputTrendPoint {
    pub bucket_start: NaiveDateTime,
    pub amount_cents: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputTrendSeries {
    pub category_id: Uuid,
    pub points: Vec<OutputTrendPoint>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputSpendingTrend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<OutputTrendPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<OutputTrendSeries>>,
    pub current_total_cents: i64,
    pub previous_total_cents: i64,
    pub change: TrendChange,
}
