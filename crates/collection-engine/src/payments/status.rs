use super::provider::{PaymentStatus, WebhookEventKind};

/// Closed translation tables between one gateway's vendor vocabulary and the
/// canonical status/event enums. Lookups are total: unrecognized vendor values
/// map to `Unknown`.
#[derive(Debug, Clone, Copy)]
pub struct StatusMapper {
    statuses: &'static [(&'static str, PaymentStatus)],
    events: &'static [(&'static str, WebhookEventKind)],
}

const ASAAS_STATUSES: &[(&str, PaymentStatus)] = &[
    ("PENDING", PaymentStatus::Pending),
    ("AWAITING_RISK_ANALYSIS", PaymentStatus::Pending),
    ("CONFIRMED", PaymentStatus::Confirmed),
    ("RECEIVED", PaymentStatus::Received),
    ("RECEIVED_IN_CASH", PaymentStatus::Received),
    ("DUNNING_RECEIVED", PaymentStatus::Received),
    ("OVERDUE", PaymentStatus::Overdue),
    ("DUNNING_REQUESTED", PaymentStatus::Overdue),
    ("REFUNDED", PaymentStatus::Refunded),
    ("REFUND_REQUESTED", PaymentStatus::Refunded),
    ("CHARGEBACK_REQUESTED", PaymentStatus::Refunded),
    ("CHARGEBACK_DISPUTE", PaymentStatus::Refunded),
    ("AWAITING_CHARGEBACK_REVERSAL", PaymentStatus::Refunded),
    ("DELETED", PaymentStatus::Deleted),
];

const ASAAS_EVENTS: &[(&str, WebhookEventKind)] = &[
    ("PAYMENT_CREATED", WebhookEventKind::Created),
    ("PAYMENT_RESTORED", WebhookEventKind::Created),
    ("PAYMENT_CONFIRMED", WebhookEventKind::Confirmed),
    ("PAYMENT_UPDATED", WebhookEventKind::Confirmed),
    ("PAYMENT_BANK_SLIP_VIEWED", WebhookEventKind::Confirmed),
    ("PAYMENT_CHECKOUT_VIEWED", WebhookEventKind::Confirmed),
    ("PAYMENT_RECEIVED", WebhookEventKind::Received),
    ("PAYMENT_DUNNING_RECEIVED", WebhookEventKind::Received),
    ("PAYMENT_OVERDUE", WebhookEventKind::Overdue),
    ("PAYMENT_DUNNING_REQUESTED", WebhookEventKind::Overdue),
    ("PAYMENT_REFUNDED", WebhookEventKind::Refunded),
    ("PAYMENT_RECEIVED_IN_CASH_UNDONE", WebhookEventKind::Refunded),
    ("PAYMENT_CHARGEBACK_REQUESTED", WebhookEventKind::Refunded),
    ("PAYMENT_CHARGEBACK_DISPUTE", WebhookEventKind::Refunded),
    ("PAYMENT_AWAITING_CHARGEBACK_REVERSAL", WebhookEventKind::Refunded),
    ("PAYMENT_DELETED", WebhookEventKind::Deleted),
];

const SANDBOX_STATUSES: &[(&str, PaymentStatus)] = &[
    ("pending", PaymentStatus::Pending),
    ("confirmed", PaymentStatus::Confirmed),
    ("received", PaymentStatus::Received),
    ("overdue", PaymentStatus::Overdue),
    ("refunded", PaymentStatus::Refunded),
    ("cancelled", PaymentStatus::Cancelled),
    ("deleted", PaymentStatus::Deleted),
];

const SANDBOX_EVENTS: &[(&str, WebhookEventKind)] = &[
    ("PAYMENT_CREATED", WebhookEventKind::Created),
    ("PAYMENT_CONFIRMED", WebhookEventKind::Confirmed),
    ("PAYMENT_RECEIVED", WebhookEventKind::Received),
    ("PAYMENT_OVERDUE", WebhookEventKind::Overdue),
    ("PAYMENT_REFUNDED", WebhookEventKind::Refunded),
    ("PAYMENT_DELETED", WebhookEventKind::Deleted),
];

impl StatusMapper {
    pub const ASAAS: StatusMapper = StatusMapper {
        statuses: ASAAS_STATUSES,
        events: ASAAS_EVENTS,
    };

    pub const SANDBOX: StatusMapper = StatusMapper {
        statuses: SANDBOX_STATUSES,
        events: SANDBOX_EVENTS,
    };

    pub fn to_internal_status(&self, vendor_status: &str) -> PaymentStatus {
        let vendor_status = vendor_status.trim();
        self.statuses
            .iter()
            .find(|(vendor, _)| vendor.eq_ignore_ascii_case(vendor_status))
            .map_or(PaymentStatus::Unknown, |(_, status)| *status)
    }

    pub fn to_internal_event(&self, vendor_event: &str) -> WebhookEventKind {
        let vendor_event = vendor_event.trim();
        self.events
            .iter()
            .find(|(vendor, _)| vendor.eq_ignore_ascii_case(vendor_event))
            .map_or(WebhookEventKind::Unknown, |(_, event)| *event)
    }

    /// Primary vendor spelling of a canonical status, if the gateway has one.
    pub fn to_vendor_status(&self, status: PaymentStatus) -> Option<&'static str> {
        self.statuses
            .iter()
            .find(|(_, canonical)| *canonical == status)
            .map(|(vendor, _)| *vendor)
    }

    pub fn vendor_statuses(&self) -> impl Iterator<Item = &'static str> {
        self.statuses.iter().map(|(vendor, _)| *vendor)
    }

    pub fn vendor_events(&self) -> impl Iterator<Item = &'static str> {
        self.events.iter().map(|(vendor, _)| *vendor)
    }
}
