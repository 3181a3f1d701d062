pub mod user_repo;
pub use user_repo::UserRepository;
pub mod session_repo;
pub use session_repo::SessionRepository;
pub mod profile_repo;
pub use profile_repo::ProfileRepository;
pub mod plan_repo;
pub use plan_repo::PlanRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod clinic_repo;
pub use clinic_repo::ClinicRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
