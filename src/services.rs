pub mod auth;
pub mod card_service;
pub mod dashboard_service;
pub mod gate_service;
pub mod order_service;
pub mod session_hub;
