#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod allocation;
pub mod db;
pub mod models;
pub mod recurrence;
pub mod reports;
pub mod request_io;
pub mod schema;
pub mod token;
pub mod validators;
