pub mod blacklisted_token;
pub mod budget;
pub mod budget_invite;
pub mod budget_member;
pub mod category;
pub mod income;
pub mod job_registry_item;
pub mod purchase;
pub mod purchase_share;
pub mod recurring_rule;
pub mod user;
