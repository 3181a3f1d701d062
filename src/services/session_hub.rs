// src/services/session_hub.rs

//! Contexto de sessão único do processo.
//!
//! Criado no start-up e compartilhado via `AppState`. Login, cadastro e
//! logout publicam eventos; quem quiser acompanhar as transições assina
//! e depois cancela a assinatura explicitamente (ou simplesmente a descarta).

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    SignedIn { user_id: Uuid, session_id: Uuid },
    #[serde(rename_all = "camelCase")]
    SignedOut { user_id: Uuid, session_id: Uuid },
}

impl SessionEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            SessionEvent::SignedIn { user_id, .. } | SessionEvent::SignedOut { user_id, .. } => *user_id,
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::SignedIn { session_id, .. } | SessionEvent::SignedOut { session_id, .. } => {
                *session_id
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SignedIn { .. } => "signed_in",
            SessionEvent::SignedOut { .. } => "signed_out",
        }
    }
}

#[derive(Clone)]
pub struct SessionHub {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publica uma transição. Sem assinantes, o evento é descartado.
    pub fn publish(&self, event: SessionEvent) {
        tracing::debug!(event = event.name(), user_id = %event.user_id(), "evento de sessão");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Próximo evento. `None` quando o hub foi encerrado.
    /// Assinantes lentos perdem eventos antigos em vez de travar o hub.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "assinante de sessão atrasado; eventos descartados");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}
