//! Inbound processor webhooks (Stripe, Razorpay).
//!
//! Both routes read the raw body so the signature can be checked before
//! parsing. Events that do not map to an escrow state, or that reference a
//! payment we do not know, are acknowledged with `applied: false`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use helphub_core::error::CoreError;
use helphub_core::escrow::{
    classify_processor_event, compute_settlement, EscrowState, PaymentStatus,
};
use helphub_core::signature::{verify_razorpay_signature, verify_stripe_signature};
use helphub_db::models::payment::Payment;
use helphub_db::repositories::{PaymentRepo, TimelineRecord};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::payment::sync_request_escrow;
use crate::response::DataResponse;
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
const RAZORPAY_SIGNATURE_HEADER: &str = "x-razorpay-signature";
const RAZORPAY_EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// Body returned to the processor.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    /// Whether a payment was updated.
    pub applied: bool,
}

fn ack(applied: bool) -> Json<DataResponse<WebhookAck>> {
    Json(DataResponse {
        data: WebhookAck {
            received: true,
            applied,
        },
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {e}")))
}

/// Move a payment to the state the processor reported.
async fn apply_processor_state(
    state: &AppState,
    payment: &Payment,
    escrow: EscrowState,
    event_id: Option<&str>,
) -> AppResult<()> {
    let status = PaymentStatus::from_processor_state(escrow);

    let updated = match status {
        PaymentStatus::Released => {
            PaymentRepo::mark_released(&state.pool, payment.id, compute_settlement(payment.amount))
                .await?
        }
        PaymentStatus::Refunded => PaymentRepo::mark_refunded(&state.pool, payment.id).await?,
        other => PaymentRepo::update_status(&state.pool, payment.id, other).await?,
    };
    if updated.is_none() {
        return Ok(());
    }

    sync_request_escrow(&state.pool, payment.request_id, status).await?;
    PaymentRepo::append_timeline(
        &state.pool,
        payment.id,
        &TimelineRecord {
            action: "webhook",
            status,
            actor_id: None,
            note: None,
            processor_event_id: event_id,
        },
    )
    .await?;

    tracing::info!(
        payment_id = payment.id,
        request_id = payment.request_id,
        status = %status,
        event_id = ?event_id,
        "Processor webhook applied",
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Stripe
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeObject,
}

/// A PaymentIntent, or a Charge/Refund that points at one.
#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
    payment_intent: Option<String>,
}

impl StripeObject {
    fn intent_id(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }
}

/// POST /stripe/webhook
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    if let Some(secret) = &state.config.processors.stripe_webhook_secret {
        let signature = header_str(&headers, STRIPE_SIGNATURE_HEADER).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Stripe-Signature header".into(),
            ))
        })?;
        verify_stripe_signature(secret, &body, signature, Utc::now().timestamp())?;
    }

    let event: StripeEvent = parse_body(&body)?;
    let Some(escrow) = classify_processor_event(&event.event_type) else {
        tracing::debug!(event_type = %event.event_type, "Ignoring Stripe event");
        return Ok(ack(false));
    };

    let intent_id = event.data.object.intent_id();
    let Some(payment) = PaymentRepo::find_by_processor_payment_id(&state.pool, intent_id).await?
    else {
        tracing::debug!(intent_id, "Stripe event for unknown payment");
        return Ok(ack(false));
    };

    apply_processor_state(&state, &payment, escrow, Some(&event.id)).await?;
    Ok(ack(true))
}

// ---------------------------------------------------------------------------
// Razorpay
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RazorpayEvent {
    event: String,
    #[serde(default)]
    payload: RazorpayPayload,
}

#[derive(Debug, Default, Deserialize)]
struct RazorpayPayload {
    payment: Option<RazorpayWrapper<RazorpayPayment>>,
    refund: Option<RazorpayWrapper<RazorpayRefund>>,
}

#[derive(Debug, Deserialize)]
struct RazorpayWrapper<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct RazorpayPayment {
    id: String,
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RazorpayRefund {
    payment_id: String,
}

/// Find the payment a Razorpay event refers to.
///
/// Holds are stored under the order id until the first payment event, at
/// which point the `pay_` id replaces it.
async fn locate_razorpay_payment(
    state: &AppState,
    payload: &RazorpayPayload,
) -> AppResult<Option<Payment>> {
    if let Some(refund) = &payload.refund {
        return Ok(
            PaymentRepo::find_by_processor_payment_id(&state.pool, &refund.entity.payment_id)
                .await?,
        );
    }

    let Some(entity) = payload.payment.as_ref().map(|p| &p.entity) else {
        return Ok(None);
    };

    if let Some(payment) = PaymentRepo::find_by_processor_payment_id(&state.pool, &entity.id).await?
    {
        return Ok(Some(payment));
    }

    let Some(order_id) = &entity.order_id else {
        return Ok(None);
    };
    match PaymentRepo::find_by_processor_payment_id(&state.pool, order_id).await? {
        Some(payment) => Ok(PaymentRepo::set_processor_ref(&state.pool, payment.id, &entity.id)
            .await?
            .or(Some(payment))),
        None => Ok(None),
    }
}

/// POST /razorpay/webhook
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    if let Some(secret) = &state.config.processors.razorpay_webhook_secret {
        let signature = header_str(&headers, RAZORPAY_SIGNATURE_HEADER).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing X-Razorpay-Signature header".into(),
            ))
        })?;
        verify_razorpay_signature(secret, &body, signature)?;
    }

    let event: RazorpayEvent = parse_body(&body)?;
    let Some(escrow) = classify_processor_event(&event.event) else {
        tracing::debug!(event_type = %event.event, "Ignoring Razorpay event");
        return Ok(ack(false));
    };

    let Some(payment) = locate_razorpay_payment(&state, &event.payload).await? else {
        tracing::debug!(event_type = %event.event, "Razorpay event for unknown payment");
        return Ok(ack(false));
    };

    let event_id = header_str(&headers, RAZORPAY_EVENT_ID_HEADER);
    apply_processor_state(&state, &payment, escrow, event_id).await?;
    Ok(ack(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_charge_points_at_its_intent() {
        let event: StripeEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"charge.captured",
                "data":{"object":{"id":"ch_1","payment_intent":"pi_1"}}}"#,
        )
        .unwrap();
        assert_eq!(event.data.object.intent_id(), "pi_1");
    }

    #[test]
    fn stripe_intent_uses_own_id() {
        let event: StripeEvent = serde_json::from_str(
            r#"{"id":"evt_2","type":"payment_intent.succeeded",
                "data":{"object":{"id":"pi_2","object":"payment_intent"}}}"#,
        )
        .unwrap();
        assert_eq!(event.data.object.intent_id(), "pi_2");
    }

    #[test]
    fn razorpay_payload_without_entities_parses() {
        let event: RazorpayEvent =
            serde_json::from_str(r#"{"event":"order.paid","payload":{}}"#).unwrap();
        assert!(event.payload.payment.is_none());
        assert!(event.payload.refund.is_none());
    }

    #[test]
    fn razorpay_refund_entity_parses() {
        let event: RazorpayEvent = serde_json::from_str(
            r#"{"event":"refund.processed","payload":{"refund":{"entity":
                {"id":"rfnd_1","payment_id":"pay_1"}}}}"#,
        )
        .unwrap();
        assert_eq!(event.payload.refund.unwrap().entity.payment_id, "pay_1");
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = parse_body::<StripeEvent>(b"not json").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
