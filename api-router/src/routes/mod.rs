pub mod health;
pub mod index;
pub mod query;
