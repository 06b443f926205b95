use super::common::*;
use crate::agreements::{AgreementError, AgreementStatus, TermsError};
use crate::collection::Channel;
use crate::payments::{CreateCustomerParams, PaymentProvider, PaymentStatus};

#[tokio::test]
async fn negotiation_creates_split_charge_and_agreement() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();

    let negotiation = orchestrator
        .negotiate(&request("debt-1", "1200", "900", 3))
        .await
        .expect("negotiated");
    let agreement = &negotiation.agreement;

    assert!(!negotiation.reused);
    assert_eq!(agreement.installment_amount, dec("300"));
    assert_eq!(agreement.discount_percentage, dec("25"));
    assert_eq!(agreement.status, AgreementStatus::Active);
    assert_eq!(agreement.payment_status, PaymentStatus::Pending);
    assert_eq!(agreement.provider_name, "sandbox");
    assert_eq!(agreement.external_reference, "agreement-debt-1");
    assert!(agreement.provider_customer_id.starts_with("test_cus_"));

    let charge = harness
        .gateway
        .get_payment(&agreement.provider_payment_id)
        .await
        .expect("charge exists");
    assert_eq!(charge.value, dec("300"));
    assert_eq!(charge.installment_count, Some(3));
    assert_eq!(charge.installment_value, Some(dec("300")));
    assert_eq!(charge.external_reference.as_deref(), Some("agreement-debt-1"));
    assert_eq!(harness.agreements.all().len(), 1);
}

#[tokio::test]
async fn single_installment_charges_the_full_amount() {
    let harness = Harness::new();

    let negotiation = harness
        .orchestrator()
        .negotiate(&request("debt-1", "1000", "800", 1))
        .await
        .expect("negotiated");

    let charge = harness
        .gateway
        .get_payment(&negotiation.agreement.provider_payment_id)
        .await
        .expect("charge exists");
    assert_eq!(charge.value, dec("800"));
    assert_eq!(charge.installment_count, None);
    assert_eq!(charge.installment_value, None);
}

#[tokio::test]
async fn repeated_negotiation_reuses_charge_and_agreement() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let terms = request("debt-1", "1200", "900", 3);

    let first = orchestrator.negotiate(&terms).await.expect("first");
    let second = orchestrator.negotiate(&terms).await.expect("second");

    assert!(second.reused);
    assert_eq!(first.agreement.id, second.agreement.id);
    assert_eq!(harness.gateway.creates(), 1);
    assert_eq!(harness.agreements.all().len(), 1);
    // Only the first negotiation notifies.
    assert_eq!(harness.messenger.sent().len(), 2);
}

#[tokio::test]
async fn lost_create_response_does_not_duplicate_the_charge() {
    let harness = Harness::with_gateway(FlakyGateway::losing(1));

    let negotiation = harness
        .orchestrator()
        .negotiate(&request("debt-1", "1200", "900", 3))
        .await
        .expect("negotiated after retry");

    assert_eq!(harness.gateway.creates(), 1);
    let charge = harness
        .gateway
        .get_payment_by_external_reference("agreement-debt-1")
        .await
        .expect("lookup")
        .expect("charge");
    assert_eq!(charge.id, negotiation.agreement.provider_payment_id);
}

#[tokio::test]
async fn zero_original_amount_fails_before_any_provider_call() {
    let harness = Harness::new();

    let err = harness
        .orchestrator()
        .negotiate(&request("debt-1", "0", "900", 3))
        .await
        .unwrap_err();

    assert!(matches!(err, AgreementError::Terms(TermsError::ZeroOriginalAmount)));
    assert_eq!(harness.gateway.creates(), 0);
    assert!(harness
        .gateway
        .get_customer_by_document(&customer().document)
        .await
        .expect("lookup")
        .is_none());
    assert!(harness.messenger.sent().is_empty());
}

#[tokio::test]
async fn existing_provider_customer_is_reused() {
    let harness = Harness::new();
    let existing = harness
        .gateway
        .create_customer(&CreateCustomerParams {
            name: "Ana Souza".to_string(),
            document: customer().document,
            email: None,
            phone: None,
        })
        .await
        .expect("customer");

    let negotiation = harness
        .orchestrator()
        .negotiate(&request("debt-1", "1200", "900", 3))
        .await
        .expect("negotiated");

    assert_eq!(negotiation.agreement.provider_customer_id, existing.id);
}

#[tokio::test]
async fn customer_is_notified_with_the_payment_link() {
    let harness = Harness::new();

    let negotiation = harness
        .orchestrator()
        .negotiate(&request("debt-1", "1200", "900", 3))
        .await
        .expect("negotiated");

    let sent = harness.messenger.sent();
    let channels: Vec<Channel> = sent.iter().map(|(channel, _, _)| *channel).collect();
    assert_eq!(channels, vec![Channel::Email, Channel::Sms]);

    let url = negotiation.agreement.payment_url.expect("payment url");
    let (_, recipient, content) = &sent[0];
    assert_eq!(recipient, "ana@example.com");
    assert!(content.body.contains(&url));
    assert!(content.body.contains("3 installment(s) of R$ 300"));
}

#[tokio::test]
async fn customer_without_document_is_rejected() {
    let harness = Harness::new();
    let mut terms = request("debt-1", "1200", "900", 3);
    terms.customer.document = crate::collection::Document::new("");

    let err = harness.orchestrator().negotiate(&terms).await.unwrap_err();

    assert!(matches!(err, AgreementError::MissingDocument(_)));
    assert_eq!(harness.gateway.creates(), 0);
}
