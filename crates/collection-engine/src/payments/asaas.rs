use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::PaymentError;
use super::provider::{
    parse_webhook_envelope, BillingType, CreateCustomerParams, CreatePaymentParams,
    PaymentProvider, PaymentStatus, ProviderCustomer, ProviderPayment, RefundParams,
    WebhookPayload,
};
use super::status::StatusMapper;
use crate::collection::Document;
use crate::config::AsaasConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Adapter for the Asaas REST API (`/v3`).
pub struct AsaasAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AsaasAdapter {
    pub const NAME: &'static str = "asaas";

    pub fn new(config: &AsaasConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| PaymentError::unavailable(Self::NAME, err))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, PaymentError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| PaymentError::unavailable(Self::NAME, "ASAAS_API_KEY is not set"))
    }

    async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, PaymentError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let api_key = self.api_key()?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("access_token", api_key)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| PaymentError::unavailable(Self::NAME, err))?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "asaas response");

        if status.is_success() {
            return response.json::<T>().await.map_err(|err| PaymentError::Gateway {
                provider: Self::NAME.to_string(),
                status: status.as_u16(),
                message: format!("unexpected response body: {err}"),
            });
        }

        let message = response
            .json::<AsaasErrorBody>()
            .await
            .ok()
            .and_then(|body| body.errors.into_iter().next())
            .map(|error| error.description)
            .unwrap_or_else(|| "Asaas API error".to_string());

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PaymentError::unavailable(
                Self::NAME,
                format!("{status}: {message}"),
            ));
        }

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(PaymentError::InvalidRequest(message));
        }

        Err(PaymentError::Gateway {
            provider: Self::NAME.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    fn payment(&self, wire: AsaasPayment) -> ProviderPayment {
        let status = StatusMapper::ASAAS.to_internal_status(&wire.status);
        if status == PaymentStatus::Unknown {
            warn!(payment = %wire.id, vendor_status = %wire.status, "unrecognized asaas payment status");
        }

        ProviderPayment {
            id: wire.id,
            customer_id: wire.customer,
            billing_type: billing_type(&wire.billing_type),
            value: wire.value,
            due_date: wire.due_date,
            status,
            vendor_status: wire.status,
            description: wire.description,
            external_reference: wire.external_reference,
            installment_count: wire.installment_count,
            installment_value: wire.installment_value,
            payment_url: wire.invoice_url,
            boleto_url: wire.bank_slip_url,
            pix_qr_code_url: wire.pix_qr_code_url,
        }
    }
}

#[async_trait]
impl PaymentProvider for AsaasAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn create_customer(
        &self,
        params: &CreateCustomerParams,
    ) -> Result<ProviderCustomer, PaymentError> {
        let body = AsaasCustomerRequest {
            name: &params.name,
            cpf_cnpj: params.document.as_str(),
            email: params.email.as_deref(),
            mobile_phone: params.phone.as_deref(),
        };
        let customer: AsaasCustomer = self
            .call(Method::POST, "/customers", &[], Some(&body))
            .await?;
        Ok(customer.into())
    }

    async fn get_customer_by_document(
        &self,
        document: &Document,
    ) -> Result<Option<ProviderCustomer>, PaymentError> {
        let page: AsaasPage<AsaasCustomer> = self
            .call::<(), _>(
                Method::GET,
                "/customers",
                &[("cpfCnpj", document.as_str())],
                None,
            )
            .await?;
        Ok(page.data.into_iter().next().map(ProviderCustomer::from))
    }

    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
    ) -> Result<ProviderPayment, PaymentError> {
        params.validate()?;
        let body = AsaasPaymentRequest {
            customer: &params.customer_id,
            billing_type: params.billing_type,
            value: params.value,
            due_date: params.due_date,
            description: params.description.as_deref(),
            external_reference: params.external_reference.as_deref(),
            installment_count: params.installment_count.filter(|count| *count > 1),
            installment_value: params
                .installment_count
                .filter(|count| *count > 1)
                .and(params.installment_value),
        };
        let payment: AsaasPayment = self
            .call(Method::POST, "/payments", &[], Some(&body))
            .await?;
        Ok(self.payment(payment))
    }

    async fn get_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        let path = format!("/payments/{payment_id}");
        match self.call::<(), AsaasPayment>(Method::GET, &path, &[], None).await {
            Ok(payment) => Ok(self.payment(payment)),
            Err(PaymentError::Gateway { status: 404, .. }) => {
                Err(PaymentError::PaymentNotFound(payment_id.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    async fn get_payment_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<ProviderPayment>, PaymentError> {
        let page: AsaasPage<AsaasPayment> = self
            .call::<(), _>(
                Method::GET,
                "/payments",
                &[("externalReference", reference)],
                None,
            )
            .await?;
        Ok(page.data.into_iter().next().map(|wire| self.payment(wire)))
    }

    async fn refund_payment(&self, _params: &RefundParams) -> Result<ProviderPayment, PaymentError> {
        Err(PaymentError::NotImplemented {
            provider: Self::NAME.to_string(),
            operation: "refund",
        })
    }

    async fn cancel_payment(&self, _payment_id: &str) -> Result<(), PaymentError> {
        Err(PaymentError::NotImplemented {
            provider: Self::NAME.to_string(),
            operation: "cancel",
        })
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookPayload, PaymentError> {
        parse_webhook_envelope(body, |event| StatusMapper::ASAAS.to_internal_event(event))
    }
}

fn billing_type(value: &str) -> BillingType {
    match value {
        "BOLETO" => BillingType::Boleto,
        "CREDIT_CARD" => BillingType::CreditCard,
        "PIX" => BillingType::Pix,
        _ => BillingType::Undefined,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AsaasCustomerRequest<'a> {
    name: &'a str,
    cpf_cnpj: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mobile_phone: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsaasCustomer {
    id: String,
    name: String,
    cpf_cnpj: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    mobile_phone: Option<String>,
}

impl From<AsaasCustomer> for ProviderCustomer {
    fn from(wire: AsaasCustomer) -> Self {
        ProviderCustomer {
            id: wire.id,
            name: wire.name,
            document: Document::new(&wire.cpf_cnpj),
            email: wire.email,
            phone: wire.mobile_phone.or(wire.phone),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AsaasPaymentRequest<'a> {
    customer: &'a str,
    billing_type: BillingType,
    value: Decimal,
    due_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_reference: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installment_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installment_value: Option<Decimal>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsaasPayment {
    id: String,
    customer: String,
    billing_type: String,
    value: Decimal,
    due_date: NaiveDate,
    status: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    installment_count: Option<u32>,
    #[serde(default)]
    installment_value: Option<Decimal>,
    #[serde(default)]
    invoice_url: Option<String>,
    #[serde(default)]
    bank_slip_url: Option<String>,
    #[serde(default)]
    pix_qr_code_url: Option<String>,
}

#[derive(Deserialize)]
struct AsaasPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct AsaasErrorBody {
    #[serde(default)]
    errors: Vec<AsaasErrorItem>,
}

#[derive(Deserialize)]
struct AsaasErrorItem {
    description: String,
}
