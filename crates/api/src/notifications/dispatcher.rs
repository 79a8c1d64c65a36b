//! Event-to-email dispatch.
//!
//! [`NotificationDispatcher`] consumes [`DomainEvent`]s, resolves recipient
//! ids to email addresses, and hands each send to its own task. Sends are
//! fire-and-forget: failures are logged and never retried.

use helphub_core::types::DbId;
use helphub_db::repositories::UserRepo;
use helphub_db::DbPool;
use helphub_events::{DomainEvent, EmailDelivery};
use tokio::sync::broadcast;

/// Routes domain events to email recipients.
pub struct NotificationDispatcher {
    pool: DbPool,
    email: Option<EmailDelivery>,
    admin_email: Option<String>,
}

impl NotificationDispatcher {
    /// `email` is `None` when SMTP is not configured; events are then only
    /// logged.
    pub fn new(pool: DbPool, email: Option<EmailDelivery>, admin_email: Option<String>) -> Self {
        Self {
            pool,
            email,
            admin_email,
        }
    }

    /// Run until the event bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.dispatch(&event).await {
                        tracing::warn!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to resolve notification recipients"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification dispatcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
    }

    /// Resolve and send notifications for a single event.
    async fn dispatch(&self, event: &DomainEvent) -> Result<(), sqlx::Error> {
        let Some(email) = &self.email else {
            tracing::debug!(
                event_type = %event.event_type,
                request_id = ?event.request_id,
                "Email not configured, dropping notification"
            );
            return Ok(());
        };

        let addresses = self.resolve_addresses(event).await?;
        for to in addresses {
            let email = email.clone();
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = email.deliver(&to, &event).await {
                    tracing::warn!(
                        error = %e,
                        to = %to,
                        event_type = %event.event_type,
                        "Notification email failed"
                    );
                }
            });
        }
        Ok(())
    }

    /// Email addresses for the event's recipients plus the admin address
    /// when requested. The acting user is never told about their own action.
    async fn resolve_addresses(&self, event: &DomainEvent) -> Result<Vec<String>, sqlx::Error> {
        let ids: Vec<DbId> = event
            .recipient_ids
            .iter()
            .copied()
            .filter(|id| Some(*id) != event.actor_id)
            .collect();

        let mut addresses = if ids.is_empty() {
            Vec::new()
        } else {
            UserRepo::emails_for(&self.pool, &ids).await?
        };

        if event.admin_recipient {
            match &self.admin_email {
                Some(admin) => addresses.push(admin.clone()),
                None => tracing::debug!(
                    event_type = %event.event_type,
                    "ADMIN_NOTIFY_EMAIL not set, skipping admin notice"
                ),
            }
        }

        addresses.sort();
        addresses.dedup();
        Ok(addresses)
    }
}

#[cfg(test)]
mod tests {
    use helphub_core::roles::{ROLE_CUSTOMER, ROLE_VOLUNTEER};
    use helphub_db::models::user::CreateUser;
    use helphub_events::bus;
    use sqlx::PgPool;

    use super::*;

    async fn user(pool: &PgPool, email: &str, role: &str) -> DbId {
        UserRepo::create(
            pool,
            &CreateUser {
                name: "n".to_string(),
                email: email.to_string(),
                password_hash: "x".to_string(),
                role: role.to_string(),
            },
        )
        .await
        .unwrap()
        .id
    }

    #[sqlx::test(migrations = "../../db/migrations")]
    async fn actor_is_never_a_recipient(pool: PgPool) {
        let customer = user(&pool, "cust@example.com", ROLE_CUSTOMER).await;
        let helper = user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;
        let dispatcher = NotificationDispatcher::new(pool, None, None);

        let event = DomainEvent::new(bus::REQUEST_CANCELLED)
            .for_request(1)
            .with_actor(customer)
            .notify(Some(customer))
            .notify(Some(helper));
        let addresses = dispatcher.resolve_addresses(&event).await.unwrap();
        assert_eq!(addresses, ["helper@example.com"]);

        // Only the actor listed: nobody to tell.
        let event = DomainEvent::new(bus::REQUEST_CANCELLED)
            .with_actor(customer)
            .notify(Some(customer));
        assert!(dispatcher.resolve_addresses(&event).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "../../db/migrations")]
    async fn admin_notice_uses_configured_address(pool: PgPool) {
        let customer = user(&pool, "cust@example.com", ROLE_CUSTOMER).await;
        let helper = user(&pool, "helper@example.com", ROLE_VOLUNTEER).await;
        let event = DomainEvent::new(bus::REQUEST_DISPUTE_RAISED)
            .for_request(1)
            .with_actor(customer)
            .notify(Some(helper))
            .notify_admin();

        let with_admin = NotificationDispatcher::new(
            pool.clone(),
            None,
            Some("ops@example.com".to_string()),
        );
        assert_eq!(
            with_admin.resolve_addresses(&event).await.unwrap(),
            ["helper@example.com", "ops@example.com"]
        );

        let without_admin = NotificationDispatcher::new(pool, None, None);
        assert_eq!(
            without_admin.resolve_addresses(&event).await.unwrap(),
            ["helper@example.com"]
        );
    }
}
