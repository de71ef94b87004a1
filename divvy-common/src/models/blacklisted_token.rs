use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};

use crate::schema::blacklisted_tokens;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = blacklisted_tokens, primary_key(token_signature))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlacklistedToken {
    pub token_signature: Vec<u8>,
    pub token_expiration: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blacklisted_tokens, primary_key(token_signature))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBlacklistedToken<'a> {
    pub token_signature: &'a [u8],
    pub token_expiration: NaiveDateTime,
}
