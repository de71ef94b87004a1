use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::purchase::Purchase;
use crate::models::user::User;
use crate::schema::purchase_shares;

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(Purchase, foreign_key = purchase_id))]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(table_name = purchase_shares, primary_key(purchase_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PurchaseShare {
    pub purchase_id: Uuid,
    pub user_id: Uuid,
    pub percent: i32,
    pub amount_cents: i64,
    pub is_settled: bool,
    pub settled_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = purchase_shares, primary_key(purchase_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPurchaseShare {
    pub purchase_id: Uuid,
    pub user_id: Uuid,
    pub percent: i32,
    pub amount_cents: i64,
    pub is_settled: bool,
    pub settled_at: Option<NaiveDateTime>,
}
