use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};

use crate::db::{DaoError, DbThreadPool};
use crate::models::blacklisted_token::NewBlacklistedToken;

use crate::schema::blacklisted_tokens as blacklisted_token_fields;
use crate::schema::blacklisted_tokens::dsl::blacklisted_tokens;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn blacklist_token(
        &self,
        token_signature: &[u8],
        token_expiration: u64,
    ) -> Result<(), DaoError> {
        let token_expiration = expiration_timestamp(token_expiration)?;

        let blacklisted_token = NewBlacklistedToken {
            token_signature,
            token_expiration,
        };

        dsl::insert_into(blacklisted_tokens)
            .values(&blacklisted_token)
            .on_conflict(blacklisted_token_fields::token_signature)
            .do_nothing()
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn check_is_token_on_blacklist_and_blacklist(
        &self,
        token_signature: &[u8],
        token_expiration: u64,
    ) -> Result<bool, DaoError> {
        let count = blacklisted_tokens
            .filter(blacklisted_token_fields::token_signature.eq(token_signature))
            .count()
            .get_result::<i64>(&mut self.db_thread_pool.get()?)?;

        if count > 0 {
            Ok(true)
        } else {
            let token_expiration = expiration_timestamp(token_expiration)?;

            let blacklisted_token = NewBlacklistedToken {
                token_signature,
                token_expiration,
            };

            dsl::insert_into(blacklisted_tokens)
                .values(&blacklisted_token)
                .execute(&mut self.db_thread_pool.get()?)?;

            Ok(false)
        }
    }

    pub fn clear_all_expired_tokens(&self) -> Result<usize, DaoError> {
        Ok(diesel::delete(
            blacklisted_tokens
                .filter(blacklisted_token_fields::token_expiration.lt(Utc::now().naive_utc())),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}

fn expiration_timestamp(token_expiration: u64) -> Result<NaiveDateTime, DaoError> {
    let seconds = i64::try_from(token_expiration)
        .map_err(|_| DaoError::CannotRunQuery("Token expiration is out of range"))?;

    DateTime::from_timestamp(seconds, 0)
        .map(|timestamp| timestamp.naive_utc())
        .ok_or(DaoError::CannotRunQuery("Token expiration is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils;

    fn future_expiration() -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap() + 3600
    }

    #[test]
    fn test_check_is_token_on_blacklist_and_blacklist() {
        let dao = Dao::new(test_utils::db_thread_pool());

        let signature = rand::random::<[u8; 32]>();

        let was_blacklisted = dao
            .check_is_token_on_blacklist_and_blacklist(&signature, future_expiration())
            .unwrap();
        assert!(!was_blacklisted);

        let was_blacklisted = dao
            .check_is_token_on_blacklist_and_blacklist(&signature, future_expiration())
            .unwrap();
        assert!(was_blacklisted);
    }

    #[test]
    fn test_blacklist_token_is_idempotent() {
        let dao = Dao::new(test_utils::db_thread_pool());

        let signature = rand::random::<[u8; 32]>();

        dao.blacklist_token(&signature, future_expiration()).unwrap();
        dao.blacklist_token(&signature, future_expiration()).unwrap();

        assert!(dao
            .check_is_token_on_blacklist_and_blacklist(&signature, future_expiration())
            .unwrap());
    }

    #[test]
    fn test_clear_all_expired_tokens() {
        let dao = Dao::new(test_utils::db_thread_pool());

        let expired_signature = rand::random::<[u8; 32]>();
        let valid_signature = rand::random::<[u8; 32]>();

        let just_passed = u64::try_from(Utc::now().timestamp()).unwrap() - 5;
        dao.blacklist_token(&expired_signature, just_passed).unwrap();
        dao.blacklist_token(&valid_signature, future_expiration())
            .unwrap();

        dao.clear_all_expired_tokens().unwrap();

        assert!(!dao
            .check_is_token_on_blacklist_and_blacklist(&expired_signature, future_expiration())
            .unwrap());
        assert!(dao
            .check_is_token_on_blacklist_and_blacklist(&valid_signature, future_expiration())
            .unwrap());
    }
}
