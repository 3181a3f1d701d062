// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::session_events,

        // --- Users ---
        handlers::auth::get_me,

        // --- Plans ---
        handlers::plans::list_plans,
        handlers::plans::get_plan,

        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::list_my_orders,
        handlers::orders::my_order_status,

        // --- Card ---
        handlers::card::my_card,
        handlers::card::my_card_qrcode,
        handlers::card::validate_card_query,
        handlers::card::validate_card,

        // --- Gate ---
        handlers::gate::check_gate,

        // --- Admin ---
        handlers::admin::list_orders,
        handlers::admin::update_order_status,
        handlers::admin::confirm_payment,
        handlers::admin::list_profiles,
        handlers::admin::update_role,
        handlers::admin::issue_card,
        handlers::admin::list_clinics,
        handlers::admin::create_clinic,
        handlers::admin::get_dashboard,
        handlers::admin::get_finance,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::Role,
            models::auth::ProfileStatus,
            models::auth::Profile,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::UpdateRolePayload,

            // --- Plans ---
            models::plan::PlanType,
            models::plan::Plan,

            // --- Orders ---
            models::order::OrderStatus,
            models::order::SubscriptionStatus,
            models::order::Order,
            models::order::Dependent,
            models::order::Subscription,
            models::order::CreatedOrder,
            models::order::OrderStatusSummary,
            models::order::TransitionResult,
            models::order::DependentPayload,
            models::order::CheckoutPayload,
            models::order::UpdateOrderStatusPayload,

            // --- Card ---
            models::card::CardView,
            models::card::ValidateCardRequest,
            models::card::CardRejection,
            models::card::CardValidation,

            // --- Gate ---
            models::gate::GateArea,
            models::gate::GateAnswer,

            // --- Clinics ---
            models::clinic::Clinic,
            models::clinic::CreateClinicPayload,

            // --- Dashboard ---
            models::dashboard::AdminKpis,
            models::dashboard::DailyRevenue,
            models::dashboard::AdminDashboard,
            models::dashboard::OrderReportRow,
            models::dashboard::FinanceKpis,
            models::dashboard::FinanceReport,
        )
    ),
    tags(
        (name = "Auth", description = "Cadastro, login e sessão"),
        (name = "Plans", description = "Catálogo de planos"),
        (name = "Orders", description = "Checkout e pedidos do cliente"),
        (name = "Card", description = "Cartão Radioclim e validação"),
        (name = "Gate", description = "Decisão de acesso às áreas do app"),
        (name = "Admin", description = "Pedidos, perfis, clínicas e indicadores")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_gate_and_admin_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/gate"));
        assert!(doc.paths.paths.contains_key("/api/admin/orders/{id}/status"));
        assert!(doc.components.is_some_and(|c| c.security_schemes.contains_key("api_jwt")));
    }
}
