//! Gateway-agnostic payment provider contract and its adapters.

pub mod asaas;
pub mod error;
pub mod factory;
pub mod provider;
pub mod retry;
pub mod sandbox;
pub mod status;

pub use asaas::AsaasAdapter;
pub use error::PaymentError;
pub use factory::provider_from_config;
pub use provider::{
    BillingType, CreateCustomerParams, CreatePaymentParams, PaymentProvider, PaymentStatus,
    ProviderCustomer, ProviderPayment, RefundParams, WebhookEventKind, WebhookPayload,
    WebhookPayment,
};
pub use retry::RetryPolicy;
pub use sandbox::SandboxGateway;
pub use status::StatusMapper;
