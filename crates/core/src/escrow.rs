//! Escrow payment model.
//!
//! Two vocabularies exist: [`PaymentStatus`] lives on the payment row and
//! [`EscrowState`] is the money view stored on the service request. The
//! request view is never written independently; it is always derived with
//! [`PaymentStatus::escrow_state`].

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::request_status::RequestStatus;

/// Platform commission taken from every release, in percent.
pub const PLATFORM_FEE_PERCENT: i64 = 10;

/// Default ISO currency code for new payments.
pub const DEFAULT_CURRENCY: &str = "usd";

/// Declares a lowercase string-backed enum with `as_str`, `Display`, and a
/// `FromStr` that reports the accepted values on failure.
macro_rules! define_str_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $variant:ident => $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Database / wire representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        $label,
                        [$( $val ),+].join(", ")
                    ))),
                }
            }
        }
    };
}

define_str_enum! {
    /// Status stored on the payment row.
    PaymentStatus ("payment status") {
        Pending => "pending",
        Completed => "completed",
        Cancelled => "cancelled",
        Released => "released",
        Refunded => "refunded",
        Escrow => "escrow",
    }
}

define_str_enum! {
    /// Money view stored on the service request (`payment_status`).
    EscrowState ("escrow state") {
        Pending => "pending",
        Held => "held",
        Released => "released",
        Refunded => "refunded",
        Failed => "failed",
    }
}

define_str_enum! {
    /// How the customer pays.
    PaymentMethod ("payment method") {
        BankTransfer => "bank_transfer",
        Paypal => "paypal",
        CreditCard => "credit_card",
        Cash => "cash",
        Upi => "upi",
    }
}

define_str_enum! {
    /// Third-party processors that can call back with webhooks.
    Processor ("processor") {
        Stripe => "stripe",
        Razorpay => "razorpay",
    }
}

impl PaymentStatus {
    /// The request-side view of this payment status.
    pub fn escrow_state(self) -> EscrowState {
        match self {
            PaymentStatus::Pending => EscrowState::Pending,
            PaymentStatus::Escrow => EscrowState::Held,
            PaymentStatus::Completed | PaymentStatus::Released => EscrowState::Released,
            PaymentStatus::Refunded => EscrowState::Refunded,
            PaymentStatus::Cancelled => EscrowState::Failed,
        }
    }

    /// Payment status to store when a processor reports `state`.
    pub fn from_processor_state(state: EscrowState) -> PaymentStatus {
        match state {
            EscrowState::Pending => PaymentStatus::Pending,
            EscrowState::Held => PaymentStatus::Escrow,
            EscrowState::Released => PaymentStatus::Released,
            EscrowState::Refunded => PaymentStatus::Refunded,
            EscrowState::Failed => PaymentStatus::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Result of splitting a released amount between platform and volunteer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub fee: i64,
    pub payout: i64,
}

/// Compute the platform fee (rounded half up) and the volunteer payout.
///
/// Widened to `i128` so every `i64` amount is exact; the fee is at most a
/// tenth of the amount and always fits back into `i64`.
pub fn compute_settlement(amount: i64) -> Settlement {
    let fee = ((i128::from(amount) * i128::from(PLATFORM_FEE_PERCENT) + 50) / 100) as i64;
    Settlement {
        fee,
        payout: amount - fee,
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Amounts are minor currency units and must be positive.
pub fn validate_amount(amount: i64) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "Payment amount must be positive (got {amount})"
        )));
    }
    Ok(())
}

/// Funds can only be put on hold for a request that is still open.
pub fn validate_hold(request_status: RequestStatus) -> Result<(), CoreError> {
    if request_status.is_terminal() {
        return Err(CoreError::StateConflict(format!(
            "Cannot hold funds for a '{request_status}' request"
        )));
    }
    Ok(())
}

/// Release requires the payment to be sitting in escrow.
pub fn validate_release(status: PaymentStatus) -> Result<(), CoreError> {
    match status {
        PaymentStatus::Escrow => Ok(()),
        PaymentStatus::Released => Err(CoreError::StateConflict(
            "Payment has already been released".into(),
        )),
        PaymentStatus::Refunded => Err(CoreError::StateConflict(
            "Payment has already been refunded".into(),
        )),
        other => Err(CoreError::StateConflict(format!(
            "Only escrowed payments can be released (payment is '{other}')"
        ))),
    }
}

/// Refund is possible from anything except an already settled payment.
pub fn validate_refund(status: PaymentStatus) -> Result<(), CoreError> {
    match status {
        PaymentStatus::Refunded => Err(CoreError::StateConflict(
            "Payment has already been refunded".into(),
        )),
        PaymentStatus::Released => Err(CoreError::StateConflict(
            "Payment has already been released and cannot be refunded".into(),
        )),
        _ => Ok(()),
    }
}

/// Releasing money for a request the customer walked away from is refused.
pub fn validate_release_for_request(request_status: RequestStatus) -> Result<(), CoreError> {
    if matches!(
        request_status,
        RequestStatus::Cancelled | RequestStatus::Declined
    ) {
        return Err(CoreError::StateConflict(format!(
            "Cannot release funds for a '{request_status}' request"
        )));
    }
    Ok(())
}

/// Pending offline payments (cash, bank transfer) can be marked completed.
pub fn validate_complete(status: PaymentStatus) -> Result<(), CoreError> {
    if status != PaymentStatus::Pending {
        return Err(CoreError::StateConflict(format!(
            "Only pending payments can be completed (payment is '{status}')"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Processor events
// ---------------------------------------------------------------------------

/// Map a processor event type to the escrow state it implies.
///
/// Only the segment after the last `.` matters, so Stripe's
/// `payment_intent.succeeded` and Razorpay's `payment.authorized` both land
/// on [`EscrowState::Held`]. Unknown events return `None` and are ignored.
pub fn classify_processor_event(event_type: &str) -> Option<EscrowState> {
    let action = event_type.rsplit('.').next().unwrap_or(event_type);
    match action {
        "succeeded" | "authorized" => Some(EscrowState::Held),
        "captured" => Some(EscrowState::Released),
        "canceled" | "cancelled" | "failed" | "payment_failed" => Some(EscrowState::Failed),
        "refunded" => Some(EscrowState::Refunded),
        "processed" if event_type.starts_with("refund.") => Some(EscrowState::Refunded),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
