pub mod admin;
pub mod auth;
pub mod card;
pub mod gate;
pub mod orders;
pub mod plans;
