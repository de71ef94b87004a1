use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::user::{NewUser, User};

use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_user(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> Result<Uuid, DaoError> {
        let current_time = Utc::now().naive_utc();
        let user_id = Uuid::now_v7();

        let email_lowercase = email.to_lowercase();

        let new_user = NewUser {
            id: user_id,
            email: &email_lowercase,
            display_name,
            password_hash,
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        let mut db_connection = self.db_thread_pool.get()?;

        diesel::insert_into(users)
            .values(&new_user)
            .execute(&mut db_connection)?;

        Ok(user_id)
    }

    pub fn get_user_by_id(&self, user_id: Uuid) -> Result<User, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users.find(user_id).get_result::<User>(&mut db_connection)?)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users
            .filter(user_fields::email.eq(email.to_lowercase()))
            .get_result::<User>(&mut db_connection)?)
    }

    pub fn get_user_id_by_email(&self, email: &str) -> Result<Uuid, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        Ok(users
            .select(user_fields::id)
            .filter(user_fields::email.eq(email.to_lowercase()))
            .get_result::<Uuid>(&mut db_connection)?)
    }
}
