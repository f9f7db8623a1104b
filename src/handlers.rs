pub mod admin;
pub mod arrangements;
pub mod health;
pub mod reservations;
