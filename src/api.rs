pub mod auth;
pub mod dashboard;
pub mod project;
pub mod risk_issue;
pub mod swagger_main;
pub mod task;
pub mod time_entry;
pub mod user;

#[cfg(test)]
pub mod test_util;
