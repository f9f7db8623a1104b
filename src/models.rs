pub mod arrangement;
pub mod auth;
pub mod catalog;
pub mod report;
pub mod reservation;
