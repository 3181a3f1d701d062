// src/services/order_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Months, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{OrderRepository, PlanRepository},
    models::{
        order::{
            CheckoutPayload, CreatedOrder, Dependent, DependentPayload, Order, OrderStatus,
            OrderStatusSummary, Subscription, TransitionResult,
        },
        plan::{Plan, PlanType},
    },
};

// =============================================================================
//  TRAVA DE ENVIO DUPLICADO
// =============================================================================

/// Um checkout em andamento por usuário. Não é idempotência: só evita o
/// duplo clique enquanto o primeiro envio ainda está sendo processado.
#[derive(Clone, Default)]
pub struct SubmissionGuard {
    in_flight: Arc<DashMap<Uuid, ()>>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, user_id: Uuid) -> Option<SubmissionTicket> {
        match self.in_flight.entry(user_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Some(SubmissionTicket {
                    guard: self.in_flight.clone(),
                    user_id,
                })
            }
        }
    }
}

/// Libera a trava ao sair de escopo (sucesso, erro ou cancelamento).
pub struct SubmissionTicket {
    guard: Arc<DashMap<Uuid, ()>>,
    user_id: Uuid,
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        self.guard.remove(&self.user_id);
    }
}

// =============================================================================
//  REGRAS DO CHECKOUT
// =============================================================================

/// O que de fato vai ser gravado para um checkout válido.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutDraft {
    pub total_value: Decimal,
    pub collaborator_count: Option<i32>,
    pub dependents: Vec<DependentPayload>,
}

/// Teto de colaboradores num pedido empresarial.
pub const MAX_COLLABORATORS: i32 = 10_000;

/// Valor total: preço do plano, ou preço × colaboradores no empresarial.
pub fn order_total(plan: &Plan, collaborator_count: Option<i32>) -> Decimal {
    match plan.plan_type {
        PlanType::Empresarial => {
            let count = collaborator_count.unwrap_or(1).max(1);
            (plan.monthly_price * Decimal::from(count)).round_dp(2)
        }
        PlanType::Individual | PlanType::Familia => plan.monthly_price.round_dp(2),
    }
}

pub fn plan_checkout(plan: &Plan, payload: &CheckoutPayload) -> Result<CheckoutDraft, AppError> {
    let collaborator_count = match plan.plan_type {
        PlanType::Empresarial => match payload.collaborator_count {
            Some(count) if (1..=MAX_COLLABORATORS).contains(&count) => Some(count),
            Some(count) if count > MAX_COLLABORATORS => {
                return Err(AppError::InvalidCheckout(format!(
                    "Quantidade de colaboradores acima do limite ({MAX_COLLABORATORS})."
                )));
            }
            _ => {
                return Err(AppError::InvalidCheckout(
                    "Informe a quantidade de colaboradores (mínimo 1).".into(),
                ));
            }
        },
        // Fora do empresarial a quantidade não se aplica
        PlanType::Individual | PlanType::Familia => None,
    };

    if !payload.dependents.is_empty() {
        if plan.plan_type != PlanType::Familia {
            return Err(AppError::InvalidCheckout(
                "Dependentes só podem ser incluídos no plano Família.".into(),
            ));
        }
        if let Some(max) = plan.max_dependents {
            if payload.dependents.len() > max.max(0) as usize {
                return Err(AppError::DependentLimitExceeded { max });
            }
        }
    }

    Ok(CheckoutDraft {
        total_value: order_total(plan, collaborator_count),
        collaborator_count,
        dependents: payload.dependents.clone(),
    })
}

/// Entrar em `pago` gera assinatura, a menos que o pedido já desse direito
/// aos benefícios (reaplicar `pago` não duplica nada).
pub fn subscription_due(previous: OrderStatus, next: OrderStatus) -> bool {
    next == OrderStatus::Pago && !previous.grants_benefits()
}

/// Sair do conjunto que dá benefícios cancela a assinatura do pedido.
pub fn subscription_cancel_due(previous: OrderStatus, next: OrderStatus) -> bool {
    previous.grants_benefits() && !next.grants_benefits()
}

pub fn next_payment_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_add_months(Months::new(1))
        .unwrap_or(today)
}

// =============================================================================
//  PERSISTÊNCIA
// =============================================================================

/// Onde o serviço de pedidos lê e grava.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn active_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError>;
    async fn latest_status(&self, user_id: Uuid) -> Result<Option<OrderStatus>, AppError>;
    async fn latest_order(&self, user_id: Uuid) -> Result<Option<Order>, AppError>;
    async fn has_active_benefits(&self, user_id: Uuid) -> Result<bool, AppError>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError>;
    async fn list_admin(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
    ) -> Result<Vec<Order>, AppError>;

    async fn insert_order(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        draft: &CheckoutDraft,
        notes: Option<&str>,
    ) -> Result<Order, AppError>;
    async fn insert_dependent(&self, order_id: Uuid, dependent: &DependentPayload) -> Result<Dependent, AppError>;

    async fn begin(&self) -> Result<Box<dyn OrderTx>, AppError>;
}

/// Unidade atômica da transição. Sem `commit`, nada é gravado.
#[async_trait]
pub trait OrderTx: Send {
    async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, AppError>;
    async fn update_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<Order, AppError>;
    async fn upsert_subscription(&mut self, order: &Order, due: NaiveDate) -> Result<Subscription, AppError>;
    async fn cancel_subscription(&mut self, order_id: Uuid) -> Result<Option<Subscription>, AppError>;
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

pub struct PgOrderStore {
    orders: OrderRepository,
    plans: PlanRepository,
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(orders: OrderRepository, plans: PlanRepository, pool: PgPool) -> Self {
        Self { orders, plans, pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn active_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        self.plans.find_active(plan_id).await
    }

    async fn latest_status(&self, user_id: Uuid) -> Result<Option<OrderStatus>, AppError> {
        self.orders.latest_status_for_user(user_id).await
    }

    async fn latest_order(&self, user_id: Uuid) -> Result<Option<Order>, AppError> {
        self.orders.latest_for_user(user_id).await
    }

    async fn has_active_benefits(&self, user_id: Uuid) -> Result<bool, AppError> {
        self.orders.has_active_benefits(user_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        self.orders.list_for_user(user_id).await
    }

    async fn list_admin(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
    ) -> Result<Vec<Order>, AppError> {
        self.orders.list_admin(status, search).await
    }

    async fn insert_order(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        draft: &CheckoutDraft,
        notes: Option<&str>,
    ) -> Result<Order, AppError> {
        self.orders
            .create_order(&self.pool, user_id, plan_id, draft.total_value, draft.collaborator_count, notes)
            .await
    }

    async fn insert_dependent(&self, order_id: Uuid, dependent: &DependentPayload) -> Result<Dependent, AppError> {
        self.orders.add_dependent(&self.pool, order_id, dependent).await
    }

    async fn begin(&self) -> Result<Box<dyn OrderTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgOrderTx {
            orders: self.orders.clone(),
            tx,
        }))
    }
}

struct PgOrderTx {
    orders: OrderRepository,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTx for PgOrderTx {
    async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        self.orders.lock_order(&mut *self.tx, order_id).await
    }

    async fn update_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<Order, AppError> {
        self.orders.update_status(&mut *self.tx, order_id, status).await
    }

    async fn upsert_subscription(&mut self, order: &Order, due: NaiveDate) -> Result<Subscription, AppError> {
        self.orders.upsert_subscription(&mut *self.tx, order, due).await
    }

    async fn cancel_subscription(&mut self, order_id: Uuid) -> Result<Option<Subscription>, AppError> {
        self.orders.cancel_subscription(&mut *self.tx, order_id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    guard: SubmissionGuard,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, guard: SubmissionGuard) -> Self {
        Self { store, guard }
    }

    // --- CHECKOUT ---

    pub async fn checkout(&self, user_id: Uuid, payload: &CheckoutPayload) -> Result<CreatedOrder, AppError> {
        let _ticket = self
            .guard
            .try_begin(user_id)
            .ok_or(AppError::SubmissionInProgress)?;

        let plan = self
            .store
            .active_plan(payload.plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)?;

        if let Some(latest) = self.store.latest_status(user_id).await? {
            if latest.is_awaiting_payment() {
                return Err(AppError::CheckoutBlocked);
            }
        }

        let draft = plan_checkout(&plan, payload)?;
        let notes = payload.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

        let order = self
            .store
            .insert_order(user_id, plan.id, &draft, notes)
            .await
            .inspect_err(|e| tracing::error!(%user_id, "Erro ao criar pedido: {}", e))?;

        tracing::info!(
            order_id = %order.id,
            %user_id,
            plan = %plan.name,
            total = %order.total_value,
            "🧾 Pedido criado"
        );

        // Dependentes: melhor esforço, o pedido fica mesmo se algum falhar
        let mut dependents = Vec::with_capacity(draft.dependents.len());
        let mut failed_dependents = 0;
        for dependent in &draft.dependents {
            match self.store.insert_dependent(order.id, dependent).await {
                Ok(created) => dependents.push(created),
                Err(e) => {
                    failed_dependents += 1;
                    tracing::warn!(order_id = %order.id, "Falha ao gravar dependente: {}", e);
                }
            }
        }

        Ok(CreatedOrder {
            order,
            dependents,
            failed_dependents,
        })
    }

    // --- CONSULTAS DO CLIENTE ---

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        self.store.list_for_user(user_id).await
    }

    pub async fn status_summary(&self, user_id: Uuid) -> Result<OrderStatusSummary, AppError> {
        let latest_order = self.store.latest_order(user_id).await?;
        let active_benefits = self.store.has_active_benefits(user_id).await?;

        Ok(OrderStatusSummary {
            active_benefits,
            checkout_blocked: latest_order
                .as_ref()
                .is_some_and(|o| o.status.is_awaiting_payment()),
            latest_order,
        })
    }

    // --- ADMIN ---

    pub async fn list_admin(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
    ) -> Result<Vec<Order>, AppError> {
        self.store.list_admin(status, search).await
    }

    /// Sobrescreve o status sem validar a direção do movimento.
    pub async fn transition(&self, order_id: Uuid, new_status: OrderStatus) -> Result<TransitionResult, AppError> {
        let mut tx = self.store.begin().await?;

        let current = tx.lock_order(order_id).await?.ok_or(AppError::OrderNotFound)?;
        let previous_status = current.status;

        if new_status.is_reverse_of(previous_status) {
            tracing::warn!(
                %order_id,
                from = previous_status.as_str(),
                to = new_status.as_str(),
                "Transição reversa de pedido"
            );
        }

        let order = tx.update_status(order_id, new_status).await?;

        // Assinatura acompanha o pedido na mesma transação
        let subscription = if subscription_due(previous_status, new_status) {
            let due = next_payment_date(Utc::now().date_naive());
            let subscription = tx.upsert_subscription(&order, due).await?;
            tracing::info!(%order_id, subscription_id = %subscription.id, "💳 Assinatura ativada");
            Some(subscription)
        } else if subscription_cancel_due(previous_status, new_status) {
            let cancelled = tx.cancel_subscription(order_id).await?;
            if let Some(subscription) = &cancelled {
                tracing::info!(%order_id, subscription_id = %subscription.id, "Assinatura cancelada");
            }
            cancelled
        } else {
            None
        };

        tx.commit().await?;

        tracing::info!(
            %order_id,
            from = previous_status.as_str(),
            to = new_status.as_str(),
            "Status do pedido atualizado"
        );

        Ok(TransitionResult {
            order,
            previous_status,
            subscription,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use crate::models::order::SubscriptionStatus;

    fn plan(plan_type: PlanType, price: Decimal, max_dependents: Option<i32>) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: "Plano".into(),
            description: String::new(),
            monthly_price: price,
            plan_type,
            legal_advisory_included: false,
            max_dependents,
            per_collaborator_pricing: plan_type == PlanType::Empresarial,
            active: true,
        }
    }

    fn payload(plan: &Plan, collaborators: Option<i32>, dependents: usize) -> CheckoutPayload {
        CheckoutPayload {
            plan_id: plan.id,
            collaborator_count: collaborators,
            dependents: (0..dependents)
                .map(|i| DependentPayload {
                    name: format!("Dependente {i}"),
                    relationship: "filho".into(),
                    birth_date: None,
                })
                .collect(),
            notes: None,
        }
    }

    #[test]
    fn business_plan_multiplies_by_collaborators() {
        let p = plan(PlanType::Empresarial, Decimal::new(2990, 2), None);
        let draft = plan_checkout(&p, &payload(&p, Some(12), 0)).unwrap();
        assert_eq!(draft.total_value, Decimal::new(35880, 2));
        assert_eq!(draft.collaborator_count, Some(12));
    }

    #[test]
    fn business_plan_requires_collaborator_count() {
        let p = plan(PlanType::Empresarial, Decimal::new(2990, 2), None);
        assert!(matches!(
            plan_checkout(&p, &payload(&p, None, 0)),
            Err(AppError::InvalidCheckout(_))
        ));
        assert!(matches!(
            plan_checkout(&p, &payload(&p, Some(0), 0)),
            Err(AppError::InvalidCheckout(_))
        ));
    }

    #[test]
    fn business_plan_caps_collaborator_count() {
        let p = plan(PlanType::Empresarial, Decimal::new(2990, 2), None);
        assert!(plan_checkout(&p, &payload(&p, Some(MAX_COLLABORATORS), 0)).is_ok());
        for count in [MAX_COLLABORATORS + 1, i32::MAX] {
            assert!(matches!(
                plan_checkout(&p, &payload(&p, Some(count), 0)),
                Err(AppError::InvalidCheckout(_))
            ));
        }
    }

    #[test]
    fn collaborator_count_is_ignored_outside_business_plan() {
        let individual = plan(PlanType::Individual, Decimal::new(3990, 2), None);
        let draft = plan_checkout(&individual, &payload(&individual, Some(0), 0)).unwrap();
        assert_eq!(draft.collaborator_count, None);

        let family = plan(PlanType::Familia, Decimal::new(6990, 2), Some(4));
        let draft = plan_checkout(&family, &payload(&family, Some(-5), 1)).unwrap();
        assert_eq!(draft.collaborator_count, None);
    }

    #[test]
    fn family_draft_keeps_dependents_as_sent() {
        let family = plan(PlanType::Familia, Decimal::new(6990, 2), Some(4));
        let body = payload(&family, Some(3), 2);

        let draft = plan_checkout(&family, &body).unwrap();
        assert_eq!(
            draft,
            CheckoutDraft {
                total_value: Decimal::new(6990, 2),
                collaborator_count: None,
                dependents: body.dependents.clone(),
            }
        );
    }

    #[test]
    fn order_total_never_goes_below_one_collaborator() {
        let p = plan(PlanType::Empresarial, Decimal::new(2990, 2), None);
        assert_eq!(order_total(&p, None), Decimal::new(2990, 2));
        assert_eq!(order_total(&p, Some(-3)), Decimal::new(2990, 2));
    }

    #[test]
    fn individual_and_family_charge_plan_price() {
        let individual = plan(PlanType::Individual, Decimal::new(3990, 2), None);
        let draft = plan_checkout(&individual, &payload(&individual, Some(7), 0)).unwrap();
        assert_eq!(draft.total_value, Decimal::new(3990, 2));
        assert_eq!(draft.collaborator_count, None);

        let family = plan(PlanType::Familia, Decimal::new(6990, 2), Some(4));
        let draft = plan_checkout(&family, &payload(&family, None, 2)).unwrap();
        assert_eq!(draft.total_value, Decimal::new(6990, 2));
        assert_eq!(draft.dependents.len(), 2);
    }

    #[test]
    fn family_plan_rejects_dependents_beyond_limit() {
        let family = plan(PlanType::Familia, Decimal::new(6990, 2), Some(4));
        assert!(plan_checkout(&family, &payload(&family, None, 4)).is_ok());
        assert!(matches!(
            plan_checkout(&family, &payload(&family, None, 5)),
            Err(AppError::DependentLimitExceeded { max: 4 })
        ));
    }

    #[test]
    fn dependents_only_on_family_plans() {
        let individual = plan(PlanType::Individual, Decimal::new(3990, 2), None);
        assert!(matches!(
            plan_checkout(&individual, &payload(&individual, None, 1)),
            Err(AppError::InvalidCheckout(_))
        ));
    }

    #[test]
    fn subscription_only_when_entering_paid() {
        assert!(subscription_due(OrderStatus::Pendente, OrderStatus::Pago));
        assert!(subscription_due(OrderStatus::AguardandoPagamento, OrderStatus::Pago));
        assert!(subscription_due(OrderStatus::Cancelado, OrderStatus::Pago));
        // Reaplicar o mesmo status não tem efeito
        assert!(!subscription_due(OrderStatus::Pago, OrderStatus::Pago));
        assert!(!subscription_due(OrderStatus::Aprovado, OrderStatus::Pago));
        assert!(!subscription_due(OrderStatus::Pendente, OrderStatus::Aprovado));
    }

    #[test]
    fn subscription_cancelled_when_leaving_benefits() {
        assert!(subscription_cancel_due(OrderStatus::Pago, OrderStatus::Cancelado));
        assert!(subscription_cancel_due(OrderStatus::Aprovado, OrderStatus::Pendente));
        assert!(!subscription_cancel_due(OrderStatus::Pago, OrderStatus::Aprovado));
        assert!(!subscription_cancel_due(OrderStatus::Pendente, OrderStatus::Cancelado));
        for status in OrderStatus::ALL {
            assert!(!(subscription_due(status, OrderStatus::Pago) && subscription_cancel_due(status, OrderStatus::Pago)));
        }
    }

    #[test]
    fn next_payment_is_one_month_ahead() {
        let jan31 = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(next_payment_date(jan31), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        let mar10 = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(next_payment_date(mar10), NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
    }

    #[test]
    fn guard_blocks_second_submission_until_ticket_drops() {
        let guard = SubmissionGuard::new();
        let user = Uuid::new_v4();

        let ticket = guard.try_begin(user).expect("primeiro envio");
        assert!(guard.try_begin(user).is_none());
        assert!(guard.try_begin(Uuid::new_v4()).is_some());

        drop(ticket);
        assert!(guard.try_begin(user).is_some());
    }

    // =========================================================================
    //  SERVIÇO COM BANCO EM MEMÓRIA
    // =========================================================================

    #[derive(Clone, Default)]
    struct MemoryState {
        orders: Vec<Order>,
        dependents: Vec<Dependent>,
        subscriptions: Vec<Subscription>,
    }

    #[derive(Default)]
    struct MemoryStore {
        plans: Vec<Plan>,
        state: Arc<Mutex<MemoryState>>,
        reject_dependent: Option<String>,
        fail_subscription: bool,
        // (insert começou, insert pode seguir)
        hold_insert: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl MemoryStore {
        fn with_plans(plans: Vec<Plan>) -> Self {
            Self {
                plans,
                ..Default::default()
            }
        }

        fn seed_order(&self, user_id: Uuid, plan_id: Uuid, status: OrderStatus) -> Order {
            let now = Utc::now();
            let order = Order {
                id: Uuid::new_v4(),
                user_id,
                plan_id,
                total_value: Decimal::new(3990, 2),
                status,
                collaborator_count: None,
                notes: None,
                created_at: now,
                updated_at: now,
            };
            self.state.lock().unwrap().orders.push(order.clone());
            order
        }

        fn snapshot(&self) -> MemoryState {
            self.state.lock().unwrap().clone()
        }
    }

    fn unavailable(what: &str) -> AppError {
        AppError::InternalServerError(anyhow::anyhow!("{what} indisponível"))
    }

    #[async_trait]
    impl OrderStore for MemoryStore {
        async fn active_plan(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
            Ok(self.plans.iter().find(|p| p.id == plan_id && p.active).cloned())
        }

        async fn latest_status(&self, user_id: Uuid) -> Result<Option<OrderStatus>, AppError> {
            Ok(self.latest_order(user_id).await?.map(|o| o.status))
        }

        async fn latest_order(&self, user_id: Uuid) -> Result<Option<Order>, AppError> {
            let state = self.state.lock().unwrap();
            Ok(state.orders.iter().rev().find(|o| o.user_id == user_id).cloned())
        }

        async fn has_active_benefits(&self, user_id: Uuid) -> Result<bool, AppError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .orders
                .iter()
                .any(|o| o.user_id == user_id && o.status.grants_benefits()))
        }

        async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
            let state = self.state.lock().unwrap();
            Ok(state.orders.iter().rev().filter(|o| o.user_id == user_id).cloned().collect())
        }

        async fn list_admin(
            &self,
            status: Option<OrderStatus>,
            _search: Option<&str>,
        ) -> Result<Vec<Order>, AppError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .orders
                .iter()
                .rev()
                .filter(|o| status.is_none_or(|s| o.status == s))
                .cloned()
                .collect())
        }

        async fn insert_order(
            &self,
            user_id: Uuid,
            plan_id: Uuid,
            draft: &CheckoutDraft,
            notes: Option<&str>,
        ) -> Result<Order, AppError> {
            if let Some((entered, release)) = &self.hold_insert {
                entered.notify_one();
                release.notified().await;
            }

            let now = Utc::now();
            let order = Order {
                id: Uuid::new_v4(),
                user_id,
                plan_id,
                total_value: draft.total_value,
                status: OrderStatus::Pendente,
                collaborator_count: draft.collaborator_count,
                notes: notes.map(str::to_string),
                created_at: now,
                updated_at: now,
            };
            self.state.lock().unwrap().orders.push(order.clone());
            Ok(order)
        }

        async fn insert_dependent(&self, order_id: Uuid, dependent: &DependentPayload) -> Result<Dependent, AppError> {
            if self.reject_dependent.as_deref() == Some(dependent.name.as_str()) {
                return Err(unavailable("dependentes"));
            }
            let created = Dependent {
                id: Uuid::new_v4(),
                order_id,
                name: dependent.name.clone(),
                relationship: dependent.relationship.clone(),
                birth_date: dependent.birth_date,
            };
            self.state.lock().unwrap().dependents.push(created.clone());
            Ok(created)
        }

        async fn begin(&self) -> Result<Box<dyn OrderTx>, AppError> {
            let staged = self.snapshot();
            Ok(Box::new(MemoryTx {
                shared: self.state.clone(),
                staged,
                fail_subscription: self.fail_subscription,
            }))
        }
    }

    // Alterações ficam em `staged` até o commit
    struct MemoryTx {
        shared: Arc<Mutex<MemoryState>>,
        staged: MemoryState,
        fail_subscription: bool,
    }

    #[async_trait]
    impl OrderTx for MemoryTx {
        async fn lock_order(&mut self, order_id: Uuid) -> Result<Option<Order>, AppError> {
            Ok(self.staged.orders.iter().find(|o| o.id == order_id).cloned())
        }

        async fn update_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<Order, AppError> {
            let order = self
                .staged
                .orders
                .iter_mut()
                .find(|o| o.id == order_id)
                .ok_or(AppError::OrderNotFound)?;
            order.status = status;
            order.updated_at = Utc::now();
            Ok(order.clone())
        }

        async fn upsert_subscription(&mut self, order: &Order, due: NaiveDate) -> Result<Subscription, AppError> {
            if self.fail_subscription {
                return Err(unavailable("assinaturas"));
            }
            if let Some(existing) = self
                .staged
                .subscriptions
                .iter_mut()
                .find(|s| s.order_id == order.id)
            {
                existing.status = SubscriptionStatus::Ativa;
                existing.next_payment_date = due;
                return Ok(existing.clone());
            }
            let created = Subscription {
                id: Uuid::new_v4(),
                user_id: order.user_id,
                plan_id: order.plan_id,
                order_id: order.id,
                status: SubscriptionStatus::Ativa,
                next_payment_date: due,
                created_at: Utc::now(),
            };
            self.staged.subscriptions.push(created.clone());
            Ok(created)
        }

        async fn cancel_subscription(&mut self, order_id: Uuid) -> Result<Option<Subscription>, AppError> {
            let found = self
                .staged
                .subscriptions
                .iter_mut()
                .find(|s| s.order_id == order_id);
            Ok(found.map(|s| {
                s.status = SubscriptionStatus::Cancelada;
                s.clone()
            }))
        }

        async fn commit(self: Box<Self>) -> Result<(), AppError> {
            let MemoryTx { shared, staged, .. } = *self;
            *shared.lock().unwrap() = staged;
            Ok(())
        }
    }

    fn service(store: &Arc<MemoryStore>) -> OrderService {
        OrderService::new(store.clone(), SubmissionGuard::new())
    }

    #[tokio::test]
    async fn checkout_creates_pending_order() {
        let business = plan(PlanType::Empresarial, Decimal::new(2990, 2), None);
        let store = Arc::new(MemoryStore::with_plans(vec![business.clone()]));
        let user = Uuid::new_v4();

        let mut body = payload(&business, Some(12), 0);
        body.notes = Some("   ".into());
        let created = service(&store).checkout(user, &body).await.unwrap();

        assert_eq!(created.order.status, OrderStatus::Pendente);
        assert_eq!(created.order.total_value, Decimal::new(35880, 2));
        assert_eq!(created.order.notes, None);
        assert_eq!(store.snapshot().orders.len(), 1);
    }

    #[tokio::test]
    async fn checkout_with_unknown_plan_is_rejected() {
        let store = Arc::new(MemoryStore::default());
        let ghost = plan(PlanType::Individual, Decimal::new(3990, 2), None);

        let result = service(&store).checkout(Uuid::new_v4(), &payload(&ghost, None, 0)).await;
        assert!(matches!(result, Err(AppError::PlanNotFound)));
    }

    #[tokio::test]
    async fn open_order_blocks_new_checkout() {
        let individual = plan(PlanType::Individual, Decimal::new(3990, 2), None);
        let store = Arc::new(MemoryStore::with_plans(vec![individual.clone()]));
        let user = Uuid::new_v4();
        store.seed_order(user, individual.id, OrderStatus::AguardandoPagamento);

        let result = service(&store).checkout(user, &payload(&individual, None, 0)).await;
        assert!(matches!(result, Err(AppError::CheckoutBlocked)));
        assert_eq!(store.snapshot().orders.len(), 1);

        // Outro usuário não é afetado
        assert!(service(&store)
            .checkout(Uuid::new_v4(), &payload(&individual, None, 0))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn second_checkout_while_first_in_flight_is_rejected() {
        let individual = plan(PlanType::Individual, Decimal::new(3990, 2), None);
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = Arc::new(MemoryStore {
            plans: vec![individual.clone()],
            hold_insert: Some((entered.clone(), release.clone())),
            ..Default::default()
        });
        let service = service(&store);
        let user = Uuid::new_v4();
        let body = payload(&individual, None, 0);

        let first = tokio::spawn({
            let service = service.clone();
            let body = body.clone();
            async move { service.checkout(user, &body).await }
        });
        entered.notified().await;

        let second = service.checkout(user, &body).await;
        assert!(matches!(second, Err(AppError::SubmissionInProgress)));

        release.notify_one();
        let created = first.await.unwrap().unwrap();
        assert_eq!(created.order.user_id, user);
        assert_eq!(store.snapshot().orders.len(), 1);
    }

    #[tokio::test]
    async fn failed_dependent_keeps_the_order() {
        let family = plan(PlanType::Familia, Decimal::new(6990, 2), Some(4));
        let store = Arc::new(MemoryStore {
            plans: vec![family.clone()],
            reject_dependent: Some("Dependente 1".into()),
            ..Default::default()
        });

        let created = service(&store)
            .checkout(Uuid::new_v4(), &payload(&family, None, 3))
            .await
            .unwrap();

        assert_eq!(created.failed_dependents, 1);
        assert_eq!(created.dependents.len(), 2);
        let state = store.snapshot();
        assert_eq!(state.orders.len(), 1);
        assert!(state.dependents.iter().all(|d| d.order_id == created.order.id));
    }

    #[tokio::test]
    async fn failed_subscription_leaves_status_untouched() {
        let individual = plan(PlanType::Individual, Decimal::new(3990, 2), None);
        let store = Arc::new(MemoryStore {
            plans: vec![individual.clone()],
            fail_subscription: true,
            ..Default::default()
        });
        let order = store.seed_order(Uuid::new_v4(), individual.id, OrderStatus::AguardandoPagamento);

        let result = service(&store).transition(order.id, OrderStatus::Pago).await;
        assert!(result.is_err());

        let state = store.snapshot();
        assert_eq!(state.orders[0].status, OrderStatus::AguardandoPagamento);
        assert!(state.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn order_keeps_a_single_subscription_across_transitions() {
        let individual = plan(PlanType::Individual, Decimal::new(3990, 2), None);
        let store = Arc::new(MemoryStore::with_plans(vec![individual.clone()]));
        let order = store.seed_order(Uuid::new_v4(), individual.id, OrderStatus::Pendente);
        let service = service(&store);

        let paid = service.transition(order.id, OrderStatus::Pago).await.unwrap();
        let first = paid.subscription.expect("assinatura criada");
        assert_eq!(first.status, SubscriptionStatus::Ativa);

        let again = service.transition(order.id, OrderStatus::Pago).await.unwrap();
        assert!(again.subscription.is_none());
        assert_eq!(again.previous_status, OrderStatus::Pago);

        let cancelled = service.transition(order.id, OrderStatus::Cancelado).await.unwrap();
        assert_eq!(
            cancelled.subscription.map(|s| s.status),
            Some(SubscriptionStatus::Cancelada)
        );

        let repaid = service.transition(order.id, OrderStatus::Pago).await.unwrap();
        let reactivated = repaid.subscription.expect("assinatura reativada");
        assert_eq!(reactivated.id, first.id);
        assert_eq!(reactivated.status, SubscriptionStatus::Ativa);

        assert_eq!(store.snapshot().subscriptions.len(), 1);
    }

    #[tokio::test]
    async fn transition_of_unknown_order_is_not_found() {
        let store = Arc::new(MemoryStore::default());
        let result = service(&store).transition(Uuid::new_v4(), OrderStatus::Pago).await;
        assert!(matches!(result, Err(AppError::OrderNotFound)));
    }

    #[tokio::test]
    async fn status_summary_reports_block_and_benefits() {
        let individual = plan(PlanType::Individual, Decimal::new(3990, 2), None);
        let store = Arc::new(MemoryStore::with_plans(vec![individual.clone()]));
        let user = Uuid::new_v4();
        store.seed_order(user, individual.id, OrderStatus::Pago);
        store.seed_order(user, individual.id, OrderStatus::Pendente);

        let summary = service(&store).status_summary(user).await.unwrap();
        assert!(summary.active_benefits);
        assert!(summary.checkout_blocked);
        assert_eq!(summary.latest_order.map(|o| o.status), Some(OrderStatus::Pendente));
    }
}
