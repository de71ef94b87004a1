use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::schema::incomes;

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(Budget, foreign_key = budget_id))]
#[diesel(table_name = incomes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Income {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub item_name: String,
    pub amount_cents: i64,
    pub received_at: NaiveDateTime,
    pub notes: Option<String>,
    pub received_by: Uuid,
    pub created_by: Uuid,
    pub is_deleted: bool,
    pub created_timestamp: NaiveDateTime,
    pub modified_timestamp: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = incomes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewIncome<'a> {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub item_name: &'a str,
    pub amount_cents: i64,
    pub received_at: NaiveDateTime,
    pub notes: Option<&'a str>,
    pub received_by: Uuid,
    pub created_by: Uuid,
    pub is_deleted: bool,
    pub created_timestamp: NaiveDateTime,
    pub modified_timestamp: NaiveDateTime,
}
