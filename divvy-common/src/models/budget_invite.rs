use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::schema::budget_invites;

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(Budget, foreign_key = budget_id))]
#[diesel(table_name = budget_invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BudgetInvite {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub sender_user_id: Uuid,
    pub recipient_user_id: Uuid,
    pub granted_role: i16,
    pub created_timestamp: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = budget_invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBudgetInvite {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub sender_user_id: Uuid,
    pub recipient_user_id: Uuid,
    pub granted_role: i16,
    pub created_timestamp: NaiveDateTime,
}
