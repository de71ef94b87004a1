use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::models::category::Category;
use crate::schema::purchases;

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(Budget, foreign_key = budget_id))]
#[diesel(belongs_to(Category, foreign_key = category_id))]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Purchase {
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
    pub is_deleted: bool,
    pub created_timestamp: NaiveDateTime,
    pub modified_timestamp: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPurchase<'a> {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub item_name: &'a str,
    pub amount_cents: i64,
    pub paid_at: NaiveDateTime,
    pub is_shared: bool,
    pub notes: Option<&'a str>,
    pub paid_by: Uuid,
    pub created_by: Uuid,
    pub is_deleted: bool,
    pub created_timestamp: NaiveDateTime,
    pub modified_timestamp: NaiveDateTime,
}
