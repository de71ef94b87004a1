use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::models::user::User;
use crate::schema::budget_members;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

impl MemberRole {
    pub fn from_i16(value: i16) -> Option<MemberRole> {
        match value {
            0 => Some(MemberRole::Owner),
            1 => Some(MemberRole::Admin),
            2 => Some(MemberRole::Member),
            _ => None,
        }
    }

    pub fn has_admin_privileges(self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl From<MemberRole> for i16 {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Owner => 0,
            MemberRole::Admin => 1,
            MemberRole::Member => 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(belongs_to(Budget, foreign_key = budget_id))]
#[diesel(table_name = budget_members, primary_key(budget_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BudgetMember {
    pub budget_id: Uuid,
    pub user_id: Uuid,
    pub role: i16,
    pub created_timestamp: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = budget_members, primary_key(budget_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBudgetMember {
    pub budget_id: Uuid,
    pub user_id: Uuid,
    pub role: i16,
    pub created_timestamp: NaiveDateTime,
}
