use crate::infra::{
    parse_amount, DigestScoring, InMemoryActionLog, InMemoryAgreementRepository,
    InMemoryRuleRepository, InMemoryTaskRepository, LoggingMessenger,
};
use chrono::{Duration, Local, NaiveDate, Utc};
use clap::Args;
use collection_engine::agreements::{
    AgreementOrchestrator, MemoryWebhookLedger, NegotiationRequest, WebhookService,
};
use collection_engine::collection::{
    recommended_action, ClassificationCriteria, CollectionEngine, CollectionPorts,
    CollectionSubject, Customer, CustomerId, Debt, DebtId, Document, Evaluation,
    MemoryScoreCache, RiskClassifier, RuleRecord, TenantId,
};
use collection_engine::config::{EngineConfig, GatewayMode};
use collection_engine::error::AppError;
use collection_engine::payments::{BillingType, RetryPolicy, SandboxGateway, WebhookEventKind};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEMO_TENANT: &str = "tenant-demo";

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Days since the debt's due date
    #[arg(long)]
    pub(crate) days_overdue: u32,
    /// Outstanding amount (e.g. 1250.90)
    #[arg(long, value_parser = parse_amount)]
    pub(crate) amount: Decimal,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Installments offered in the negotiated agreement
    #[arg(long, default_value_t = 3)]
    pub(crate) installments: u32,
    /// Discount granted on the original balance, in percent
    #[arg(long, default_value_t = 25)]
    pub(crate) discount: u32,
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let criteria = ClassificationCriteria {
        days_overdue: args.days_overdue,
        amount: args.amount,
        history: None,
    };
    let assessment = RiskClassifier::default().classify(&criteria);

    println!("Risk classification");
    println!("  Days overdue: {}", criteria.days_overdue);
    println!("  Amount: R$ {}", criteria.amount.round_dp(2));
    println!("  Tier: {}", assessment.tier.label());
    println!(
        "  Rule: {}{}",
        assessment.applied_rule,
        if assessment.matched { "" } else { " (fallback)" }
    );
    println!("  Risk score: {}", assessment.score);
    println!(
        "  Recommended action: {}",
        recommended_action(assessment.tier, criteria.days_overdue)
    );
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let gateway = Arc::new(SandboxGateway::new(GatewayMode::Test)?);
    let messenger = Arc::new(LoggingMessenger::default());
    let tasks = Arc::new(InMemoryTaskRepository::default());
    let logs = Arc::new(InMemoryActionLog::default());
    let agreements = Arc::new(InMemoryAgreementRepository::default());

    let ports = CollectionPorts {
        rules: Arc::new(InMemoryRuleRepository::with_records(demo_rules())),
        tasks: tasks.clone(),
        logs: logs.clone(),
        scoring: Arc::new(DigestScoring),
        messenger: messenger.clone(),
        cache: Arc::new(MemoryScoreCache::default()),
    };
    let engine = CollectionEngine::new(&EngineConfig::default(), ports);

    println!("Collection engine demo (sandbox gateway)");
    println!("\nBatch evaluation");
    let subjects = demo_subjects();
    let report = engine
        .run_batch(subjects.clone(), &CancellationToken::new())
        .await;
    for evaluation in &report.evaluated {
        render_evaluation(evaluation);
    }
    for failure in &report.failures {
        println!("- {}: failed ({})", failure.debt_id, failure.error);
    }
    println!(
        "Tasks opened: {} | Action log entries: {}",
        tasks.tasks().len(),
        logs.entries().len()
    );

    let Some(subject) = subjects.first() else {
        return Ok(());
    };
    let original = subject.debt.amount;
    let agreed = (original * Decimal::from(100u32.saturating_sub(args.discount))
        / Decimal::ONE_HUNDRED)
        .round_dp(2);

    let orchestrator = AgreementOrchestrator::new(
        gateway.clone(),
        agreements.clone(),
        messenger.clone(),
        RetryPolicy::default(),
    );
    let request = NegotiationRequest {
        tenant_id: subject.tenant_id.clone(),
        debt_id: subject.debt.id.clone(),
        customer: subject.customer.clone(),
        original_amount: original,
        agreed_amount: agreed,
        installments: args.installments,
        billing_type: BillingType::Pix,
        due_date: Local::now().date_naive() + Duration::days(7),
        description: None,
        external_reference: None,
    };
    let negotiation = orchestrator.negotiate(&request).await?;
    let agreement = negotiation.agreement;

    println!("\nAgreement for {}", agreement.debt_id);
    println!(
        "  R$ {} -> R$ {} ({}% off) in {} installment(s) of R$ {}",
        agreement.original_amount,
        agreement.agreed_amount,
        agreement.discount_percentage,
        agreement.installments,
        agreement.installment_amount
    );
    println!("  Provider payment: {}", agreement.provider_payment_id);
    if let Some(url) = &agreement.payment_url {
        println!("  Payment link: {url}");
    }

    let webhooks = WebhookService::new(
        gateway.clone(),
        agreements,
        Arc::new(MemoryWebhookLedger::default()),
    );
    gateway.simulate_receipt(&agreement.provider_payment_id)?;
    let body = gateway.webhook_body(&agreement.provider_payment_id, WebhookEventKind::Received)?;

    println!("\nWebhook delivery");
    for attempt in 1..=2 {
        let outcome = match webhooks.handle(&body).await {
            Ok(outcome) => outcome.label().to_string(),
            Err(err) => format!("error: {err}"),
        };
        println!("  Delivery #{attempt}: {outcome}");
    }

    println!("\nOutbound messages: {}", messenger.outbox().len());
    Ok(())
}

fn render_evaluation(evaluation: &Evaluation) {
    println!(
        "- {}: score {} (class {:?}), risk {} -> rule '{}' [{}], {}",
        evaluation.debt_id,
        evaluation.recovery.score,
        evaluation.recovery.class,
        evaluation.risk.tier.label(),
        evaluation.resolution.rule.name,
        evaluation.resolution.process_type().label(),
        evaluation.outcome.label()
    );
    println!("    hint: {}", evaluation.recommended_action);
}

fn demo_rules() -> Vec<RuleRecord> {
    let created_at = Utc::now();
    vec![
        RuleRecord {
            id: "standard-reminders".to_string(),
            tenant_id: DEMO_TENANT.to_string(),
            name: "Standard reminders".to_string(),
            priority: 1,
            rule_type: "default".to_string(),
            active_for_customers: Vec::new(),
            min_score: 294,
            max_score: 1000,
            process_type: "automatic".to_string(),
            is_active: true,
            revision: 1,
            created_at,
        },
        RuleRecord {
            id: "key-accounts".to_string(),
            tenant_id: DEMO_TENANT.to_string(),
            name: "Key accounts".to_string(),
            priority: 10,
            rule_type: "custom".to_string(),
            active_for_customers: vec!["cus-003".to_string()],
            min_score: 0,
            max_score: 1000,
            process_type: "assisted".to_string(),
            is_active: true,
            revision: 1,
            created_at,
        },
    ]
}

fn demo_subjects() -> Vec<CollectionSubject> {
    let today = Local::now().date_naive();
    let people = [
        ("cus-001", "Ana Souza", "123.456.789-09", Some("ana@example.com"), Some("+5511999990001"), 45, 1_200),
        ("cus-002", "Bruno Lima", "987.654.321-00", None, None, 95, 6_400),
        ("cus-003", "Carla Dias", "12.345.678/0001-95", Some("financeiro@carla.example"), None, 20, 15_000),
    ];

    people
        .into_iter()
        .enumerate()
        .map(|(index, (id, name, document, email, phone, days, amount))| {
            let tenant = TenantId(DEMO_TENANT.to_string());
            let customer_id = CustomerId(id.to_string());
            CollectionSubject {
                tenant_id: tenant.clone(),
                customer: Customer {
                    id: customer_id.clone(),
                    tenant_id: tenant,
                    name: name.to_string(),
                    document: Document::new(document),
                    email: email.map(str::to_string),
                    phone: phone.map(str::to_string),
                },
                debt: Debt {
                    id: DebtId(format!("debt-{:03}", index + 1)),
                    customer_id,
                    amount: Decimal::from(amount),
                    due_date: due_date(today, days),
                    days_overdue: days,
                },
                history: None,
            }
        })
        .collect()
}

fn due_date(today: NaiveDate, days_overdue: u32) -> NaiveDate {
    today - Duration::days(i64::from(days_overdue))
}
