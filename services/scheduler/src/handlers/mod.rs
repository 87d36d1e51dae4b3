pub mod auth;
pub mod cron;
pub mod health;
pub mod unsubscribe;
