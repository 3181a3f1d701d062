pub mod auth;
pub mod card;
pub mod clinic;
pub mod dashboard;
pub mod gate;
pub mod order;
pub mod plan;
