use chrono::NaiveDate;

use arbiter_audit::AuditLog;
use arbiter_core::{BankTransaction, DecisionAction, Direction, InvoiceCandidate, InvoiceStatus, TenantId};
use arbiter_engine::{
    Categorizer, CategorizerConfig, CategoryPattern, MatcherConfig, MemorySource, PatternService,
    PatternSet, PaymentMatcher,
};

fn tenant() -> TenantId {
    TenantId::new("tenant-1")
}

fn credit(id: &str, reference: Option<&str>, payee: Option<&str>, amount_cents: i64) -> BankTransaction {
    BankTransaction {
        id: id.to_string(),
        date: NaiveDate::from_ymd_opt(2026, 4, 2).expect("valid date"),
        amount_cents,
        direction: Direction::Credit,
        reference: reference.map(str::to_string),
        payee: payee.map(str::to_string),
        description: "bank credit received".to_string(),
    }
}

fn invoice(id: &str, number: &str, counterparty: &str, total_cents: i64) -> InvoiceCandidate {
    InvoiceCandidate {
        id: id.to_string(),
        number: number.to_string(),
        counterparty: counterparty.to_string(),
        total_cents,
        allocated_cents: 0,
        status: InvoiceStatus::Sent,
    }
}

fn pattern(id: &str, regex: &str, confidence: u8) -> CategoryPattern {
    CategoryPattern {
        id: id.to_string(),
        pattern: regex.to_string(),
        account_code: "485".to_string(),
        account_name: "Subscriptions".to_string(),
        vat_code: None,
        confidence,
        direction: None,
        max_amount_cents: None,
        requires_review: false,
        review_reason: None,
    }
}

fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(|line| serde_json::from_str(line).expect("audit line is valid JSON"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn every_matching_outcome_is_logged_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let audit_dir = dir.path().join("audit");
    let tenant = tenant();

    let mut source = MemorySource::new();
    source.add_invoice(&tenant, invoice("inv-exact", "INV-00123", "Acme Pty Ltd", 50_000));
    source.add_invoice(&tenant, invoice("inv-other", "INV-00456", "Beta Traders", 99_000));

    let audit = AuditLog::open(&audit_dir);
    let matcher = PaymentMatcher::new(MatcherConfig::default(), source, audit.clone());

    // Clean auto-apply: reference and amount line up for exactly one invoice.
    let applied = matcher
        .match_transaction(&tenant, &credit("tx-1", Some("INV-00123"), Some("Acme Pty Ltd"), 50_000))
        .await
        .unwrap();
    assert_eq!(applied.action, DecisionAction::AutoApply);
    assert_eq!(applied.chosen_candidate.as_deref(), Some("inv-exact"));

    // Weak signals: the best survivor stays under the auto-apply threshold.
    let reviewed = matcher
        .match_transaction(&tenant, &credit("tx-2", None, None, 50_000))
        .await
        .unwrap();
    assert_eq!(reviewed.action, DecisionAction::ReviewRequired);

    // Nothing clears the candidate floor.
    let unmatched = matcher
        .match_transaction(&tenant, &credit("tx-3", None, None, 1))
        .await
        .unwrap();
    assert_eq!(unmatched.action, DecisionAction::NoMatch);
    assert!(unmatched.chosen_candidate.is_none());
    assert!(unmatched.alternatives.is_empty());

    for decision in [&applied, &reviewed, &unmatched] {
        assert!(decision.confidence <= 100);
    }

    audit.flush().await;
    let decisions = read_lines(&audit_dir.join("decisions.jsonl"));
    assert_eq!(decisions.len(), 3);
    assert_eq!(decisions[0]["auto_applied"], true);
    assert_eq!(decisions[2]["action"], "NoMatch");

    // Only the reviewed outcome escalates; auto-apply and no-match do not.
    let escalations = read_lines(&audit_dir.join("escalations.jsonl"));
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0]["kind"], "LowConfidence");
    assert_eq!(escalations[0]["subject_id"], "tx-2");
}

#[tokio::test]
async fn matching_is_idempotent_for_a_fixed_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let tenant = tenant();

    let mut source = MemorySource::new();
    source.add_invoice(&tenant, invoice("inv-1", "INV-777", "Initech", 42_000));
    let matcher = PaymentMatcher::new(
        MatcherConfig::default(),
        source,
        AuditLog::open(dir.path().join("audit")),
    );

    let transaction = credit("tx-1", Some("INV-777"), Some("Initech"), 42_000);
    let first = matcher.match_transaction(&tenant, &transaction).await.unwrap();
    let second = matcher.match_transaction(&tenant, &transaction).await.unwrap();

    assert_eq!(first.action, second.action);
    assert_eq!(first.confidence, second.confidence);
    assert_eq!(first.chosen_candidate, second.chosen_candidate);
}

#[tokio::test]
async fn categorization_and_matching_share_one_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let audit_dir = dir.path().join("audit");
    let tenant = tenant();
    let audit = AuditLog::open(&audit_dir);

    let mut source = MemorySource::new();
    source.add_invoice(&tenant, invoice("inv-1", "INV-00123", "Acme Pty Ltd", 50_000));
    let matcher = PaymentMatcher::new(MatcherConfig::default(), source, audit.clone());

    let patterns = PatternService::new(PatternSet::compile(1, vec![pattern("gh", "github", 95)]));
    let categorizer = Categorizer::new(
        CategorizerConfig::default(),
        patterns,
        MemorySource::new(),
        audit.clone(),
    );

    matcher
        .match_transaction(&tenant, &credit("tx-1", Some("INV-00123"), None, 50_000))
        .await
        .unwrap();

    let mut subscription = credit("tx-2", None, Some("GitHub Inc"), 1_900);
    subscription.direction = Direction::Debit;
    subscription.description = "github monthly subscription plan renewal".to_string();
    let categorized = categorizer.categorize(&tenant, &subscription).await;
    assert_eq!(categorized.chosen_candidate.as_deref(), Some("485"));

    audit.flush().await;
    let decisions = read_lines(&audit_dir.join("decisions.jsonl"));
    assert_eq!(decisions.len(), 2);
    let subjects: Vec<&str> = decisions
        .iter()
        .map(|d| d["subject_id"].as_str().unwrap())
        .collect();
    assert_eq!(subjects, vec!["tx-1", "tx-2"]);
}

#[tokio::test]
async fn concurrent_tenants_classify_independently() {
    let dir = tempfile::tempdir().unwrap();
    let tenant_a = TenantId::new("tenant-a");
    let tenant_b = TenantId::new("tenant-b");

    let mut source = MemorySource::new();
    source.add_invoice(&tenant_a, invoice("inv-a", "INV-1", "Acme", 10_000));
    source.add_invoice(&tenant_b, invoice("inv-b", "INV-1", "Acme", 10_000));

    let matcher = std::sync::Arc::new(PaymentMatcher::new(
        MatcherConfig::default(),
        source,
        AuditLog::open(dir.path().join("audit")),
    ));

    let transaction = credit("tx-1", Some("INV-1"), None, 10_000);
    let a = tokio::spawn({
        let matcher = matcher.clone();
        let transaction = transaction.clone();
        async move { matcher.match_transaction(&tenant_a, &transaction).await }
    });
    let b = tokio::spawn({
        let matcher = matcher.clone();
        let transaction = transaction.clone();
        async move { matcher.match_transaction(&tenant_b, &transaction).await }
    });

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(a.chosen_candidate.as_deref(), Some("inv-a"));
    assert_eq!(b.chosen_candidate.as_deref(), Some("inv-b"));
}
