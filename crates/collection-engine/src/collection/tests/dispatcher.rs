use super::common::*;
use crate::collection::{
    ActionDispatcher, ActionStatus, ActionType, Channel, CollectionSubject,
    DispatchOutcome, Resolution, RuleResolver, RuleTable, TaskType,
};

fn dispatcher(harness: &Harness) -> ActionDispatcher {
    ActionDispatcher::new(
        harness.tasks.clone(),
        harness.logs.clone(),
        harness.messenger.clone(),
    )
}

fn resolve(subject: &CollectionSubject, table: &RuleTable, score: i32) -> Resolution {
    RuleResolver::default().resolve(table, &subject.tenant_id, &subject.customer.id, score)
}

#[tokio::test]
async fn automatic_rule_sends_on_every_channel_with_one_log() {
    let harness = Harness::new(500, Vec::new());
    let subject = contactable_subject("debt-1");
    let resolution = resolve(&subject, &RuleTable::default(), 500);

    let outcome = dispatcher(&harness)
        .dispatch(&subject, &resolution, 500)
        .await
        .expect("dispatch");

    assert_eq!(
        outcome,
        DispatchOutcome::MessageSent {
            channels: vec![Channel::Email, Channel::Sms]
        }
    );
    let sent = harness.messenger.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1, "ana@example.com");
    assert!(sent[0].2.body.contains("debt-1"));

    let logs = harness.logs.all();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action_type, ActionType::AutoMessage);
    assert_eq!(logs[0].status, ActionStatus::Sent);
    assert!(harness.tasks.all().is_empty());
}

#[tokio::test]
async fn low_score_opens_one_blocked_manual_task_and_sends_nothing() {
    let harness = Harness::new(100, Vec::new());
    let subject = contactable_subject("debt-2");
    let resolution = resolve(&subject, &RuleTable::default(), 100);

    let outcome = dispatcher(&harness)
        .dispatch(&subject, &resolution, 100)
        .await
        .expect("dispatch");

    let tasks = harness.tasks.all();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_type, TaskType::Manual);
    assert!(tasks[0].auto_dispatch_blocked);
    assert_eq!(outcome, DispatchOutcome::TaskOpened { task: tasks[0].clone() });
    assert!(harness.messenger.sent().is_empty());

    let logs = harness.logs.all();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action_type, ActionType::ManualTask);
    assert_eq!(logs[0].status, ActionStatus::Created);
}

#[tokio::test]
async fn assisted_rule_opens_unblocked_task() {
    let harness = Harness::new(500, Vec::new());
    let subject = contactable_subject("debt-3");
    let table = RuleTable::from_records(
        &tenant(),
        vec![record("assist", "custom", &["cus-1"], (0, 1000), "assisted", 1)],
    )
    .expect("valid");
    let resolution = resolve(&subject, &table, 500);

    dispatcher(&harness)
        .dispatch(&subject, &resolution, 500)
        .await
        .expect("dispatch");

    let tasks = harness.tasks.all();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_type, TaskType::Assisted);
    assert!(!tasks[0].auto_dispatch_blocked);
    assert_eq!(tasks[0].origin.rule_id.0, "assist");
    assert!(harness.messenger.sent().is_empty());
}

#[tokio::test]
async fn missing_contact_degrades_to_manual() {
    let harness = Harness::new(500, Vec::new());
    let subject = subject("debt-4", customer("cus-1", Some("  "), None));
    let resolution = resolve(&subject, &RuleTable::default(), 500);

    let outcome = dispatcher(&harness)
        .dispatch(&subject, &resolution, 500)
        .await
        .expect("dispatch");

    assert!(matches!(outcome, DispatchOutcome::Degraded { ref task } if task.auto_dispatch_blocked));
    assert!(harness.messenger.sent().is_empty());
    assert_eq!(harness.tasks.all()[0].task_type, TaskType::Manual);
}

#[tokio::test]
async fn partial_delivery_still_counts_as_sent() {
    let harness = Harness::with_messenger(
        500,
        Vec::new(),
        RecordingMessenger::failing(&[Channel::Sms]),
    );
    let subject = contactable_subject("debt-5");
    let resolution = resolve(&subject, &RuleTable::default(), 500);

    let outcome = dispatcher(&harness)
        .dispatch(&subject, &resolution, 500)
        .await
        .expect("dispatch");

    assert_eq!(
        outcome,
        DispatchOutcome::MessageSent {
            channels: vec![Channel::Email]
        }
    );
    let logs = harness.logs.all();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, ActionStatus::Sent);
    assert!(logs[0].detail.as_deref().unwrap_or_default().contains("gateway timeout"));
}

#[tokio::test]
async fn total_failure_logs_failed_and_opens_follow_up() {
    let harness = Harness::with_messenger(
        500,
        Vec::new(),
        RecordingMessenger::failing(&[Channel::Email, Channel::Sms]),
    );
    let subject = contactable_subject("debt-6");
    let resolution = resolve(&subject, &RuleTable::default(), 500);

    let outcome = dispatcher(&harness)
        .dispatch(&subject, &resolution, 500)
        .await
        .expect("dispatch");

    match outcome {
        DispatchOutcome::MessageFailed { follow_up, .. } => {
            assert_eq!(follow_up.task_type, TaskType::Assisted);
            assert!(!follow_up.auto_dispatch_blocked);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let logs = harness.logs.all();
    assert_eq!(logs.len(), 2);
    assert_eq!(
        (logs[0].action_type, logs[0].status),
        (ActionType::AutoMessage, ActionStatus::Failed)
    );
    assert_eq!(
        (logs[1].action_type, logs[1].status),
        (ActionType::AssistedTask, ActionStatus::Created)
    );
}

#[tokio::test]
async fn manual_task_blocks_until_the_rule_changes() {
    let harness = Harness::new(500, Vec::new());
    let dispatcher = dispatcher(&harness);
    let subject = contactable_subject("debt-7");
    let hold = |revision: u32, process: &str| {
        let mut rule = record("vip", "custom", &["cus-1"], (0, 1000), process, 1);
        rule.revision = revision;
        RuleTable::from_records(&tenant(), vec![rule]).expect("valid")
    };

    let manual = resolve(&subject, &hold(1, "manual"), 500);
    dispatcher.dispatch(&subject, &manual, 500).await.expect("manual");

    // Flipping the process type without a new revision keeps the block.
    let unchanged = resolve(&subject, &hold(1, "automatic"), 500);
    let outcome = dispatcher
        .dispatch(&subject, &unchanged, 500)
        .await
        .expect("blocked");
    assert!(matches!(outcome, DispatchOutcome::Blocked { .. }));
    assert!(harness.messenger.sent().is_empty());

    let edited = resolve(&subject, &hold(2, "automatic"), 500);
    let outcome = dispatcher.dispatch(&subject, &edited, 500).await.expect("sent");
    assert!(matches!(outcome, DispatchOutcome::MessageSent { .. }));
    assert_eq!(harness.messenger.sent().len(), 2);
}

#[tokio::test]
async fn builtin_block_holds_when_score_recovers() {
    let harness = Harness::new(500, Vec::new());
    let dispatcher = dispatcher(&harness);
    let subject = contactable_subject("debt-8");

    let low = resolve(&subject, &RuleTable::default(), 120);
    dispatcher.dispatch(&subject, &low, 120).await.expect("manual");

    let recovered = resolve(&subject, &RuleTable::default(), 640);
    let outcome = dispatcher
        .dispatch(&subject, &recovered, 640)
        .await
        .expect("blocked");
    assert!(matches!(outcome, DispatchOutcome::Blocked { .. }));

    assert_eq!(harness.tasks.all().len(), 1);
    assert_eq!(harness.logs.all().last().map(|l| l.status), Some(ActionStatus::Blocked));
}

#[tokio::test]
async fn older_block_survives_a_newer_block_from_another_rule() {
    let harness = Harness::new(500, Vec::new());
    let dispatcher = dispatcher(&harness);
    let reachable = contactable_subject("debt-9");
    let unreachable = subject("debt-9", customer("cus-1", None, None));

    let low = resolve(&reachable, &RuleTable::default(), 120);
    dispatcher.dispatch(&reachable, &low, 120).await.expect("builtin manual");

    let custom = RuleTable::from_records(
        &tenant(),
        vec![record("x", "custom", &["cus-1"], (0, 1000), "automatic", 1)],
    )
    .expect("valid");
    let degraded = resolve(&unreachable, &custom, 640);
    let outcome = dispatcher
        .dispatch(&unreachable, &degraded, 640)
        .await
        .expect("degraded");
    assert!(matches!(outcome, DispatchOutcome::Degraded { .. }));

    let recovered = resolve(&reachable, &RuleTable::default(), 640);
    let outcome = dispatcher
        .dispatch(&reachable, &recovered, 640)
        .await
        .expect("blocked");

    let first_block = harness.tasks.all()[0].id.clone();
    assert!(matches!(
        outcome,
        DispatchOutcome::Blocked { ref blocking_task } if *blocking_task == first_block
    ));
    assert!(harness.messenger.sent().is_empty());
}
