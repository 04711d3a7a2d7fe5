//! Failover controller behaviour with scripted providers.
//!
//! Time-dependent tests run on a paused clock and move it with
//! `tokio::time::advance`.

mod common;

use common::mocks::ScriptedGenerator;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use via::llm::{
    FailoverConfig, FailoverController, FailoverError, FailureKind, GenerationProvider,
    ProviderError, ProviderStatus,
};

fn controller(providers: &[&Arc<ScriptedGenerator>], config: FailoverConfig) -> FailoverController {
    let chain: Vec<Arc<dyn GenerationProvider>> = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn GenerationProvider>)
        .collect();
    FailoverController::new(chain, config)
}

#[tokio::test]
async fn test_primary_answers_when_healthy() {
    let primary = ScriptedGenerator::healthy("primary");
    let secondary = ScriptedGenerator::healthy("secondary");
    let failover = controller(&[&primary, &secondary], FailoverConfig::default());

    let answer = failover.generate("q", "ctx").await.unwrap();

    assert_eq!(answer.provider_id, "primary");
    assert_eq!(answer.generation.model_id, "primary-model");
    assert_eq!(secondary.calls(), 0);
    assert!(failover
        .states()
        .iter()
        .all(|s| s.status == ProviderStatus::Available));
}

#[rstest]
#[case(FailureKind::RateLimited)]
#[case(FailureKind::QuotaExhausted)]
#[case(FailureKind::InvalidCredential)]
#[case(FailureKind::Unauthorized)]
#[case(FailureKind::Timeout)]
#[case(FailureKind::Unavailable)]
#[tokio::test]
async fn test_provider_failure_fails_over(#[case] kind: FailureKind) {
    let primary = ScriptedGenerator::failing("primary", kind);
    let secondary = ScriptedGenerator::healthy("secondary");
    let failover = controller(&[&primary, &secondary], FailoverConfig::default());

    let answer = failover.generate("q", "ctx").await.unwrap();

    assert_eq!(answer.provider_id, "secondary");
    assert_eq!(primary.calls(), 1);
    let states = failover.states();
    assert_eq!(states[0].status, ProviderStatus::Cooling);
    assert_eq!(states[0].last_failure, Some(kind));
    assert!(states[0].cooldown_remaining.is_some());
    assert_eq!(states[1].status, ProviderStatus::Available);
}

#[tokio::test]
async fn test_cooling_provider_is_skipped() {
    let primary = ScriptedGenerator::new("primary");
    primary.push_failure(FailureKind::RateLimited);
    let primary = Arc::new(primary);
    let secondary = ScriptedGenerator::healthy("secondary");
    let failover = controller(&[&primary, &secondary], FailoverConfig::default());

    failover.generate("q1", "ctx").await.unwrap();
    let answer = failover.generate("q2", "ctx").await.unwrap();

    assert_eq!(answer.provider_id, "secondary");
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_expires_lazily() {
    let primary = ScriptedGenerator::new("primary");
    primary.push_failure(FailureKind::Unavailable);
    let primary = Arc::new(primary);
    let secondary = ScriptedGenerator::healthy("secondary");
    let failover = controller(
        &[&primary, &secondary],
        FailoverConfig::default().with_cooldown(Duration::from_secs(60)),
    );

    failover.generate("q1", "ctx").await.unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    let answer = failover.generate("q2", "ctx").await.unwrap();
    assert_eq!(answer.provider_id, "secondary");
    assert_eq!(failover.states()[0].status, ProviderStatus::Cooling);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(failover.states()[0].status, ProviderStatus::Available);
    let answer = failover.generate("q3", "ctx").await.unwrap();
    assert_eq!(answer.provider_id, "primary");
    assert_eq!(primary.calls(), 2);
}

#[tokio::test]
async fn test_retry_failure_is_terminal() {
    let primary = ScriptedGenerator::failing("primary", FailureKind::RateLimited);
    let secondary = ScriptedGenerator::failing("secondary", FailureKind::QuotaExhausted);
    let tertiary = ScriptedGenerator::healthy("tertiary");
    let failover = controller(&[&primary, &secondary, &tertiary], FailoverConfig::default());

    let err = failover.generate("q", "ctx").await.unwrap_err();

    match err {
        FailoverError::ProviderFailed { provider_id, kind } => {
            assert_eq!(provider_id, "secondary");
            assert_eq!(kind, FailureKind::QuotaExhausted);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(tertiary.calls(), 0);

    let states = failover.states();
    assert_eq!(states[0].status, ProviderStatus::Cooling);
    assert_eq!(states[1].status, ProviderStatus::Cooling);
    assert_eq!(states[2].status, ProviderStatus::Available);

    // the next query starts on the remaining provider
    let answer = failover.generate("q", "ctx").await.unwrap();
    assert_eq!(answer.provider_id, "tertiary");
}

#[tokio::test]
async fn test_all_cooling_is_unavailable() {
    let primary = ScriptedGenerator::failing("primary", FailureKind::RateLimited);
    let secondary = ScriptedGenerator::failing("secondary", FailureKind::RateLimited);
    let failover = controller(&[&primary, &secondary], FailoverConfig::default());

    assert!(failover.generate("q", "ctx").await.is_err());
    let err = failover.generate("q", "ctx").await.unwrap_err();

    assert!(matches!(err, FailoverError::Unavailable));
    assert!(err.to_string().contains("temporarily unavailable"));
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 1);
}

#[rstest]
#[case(FailureKind::QuotaExhausted)]
#[case(FailureKind::Unavailable)]
#[tokio::test]
async fn test_single_provider_is_not_retried(#[case] kind: FailureKind) {
    let only = ScriptedGenerator::failing("only", kind);
    let failover = controller(
        &[&only],
        FailoverConfig::default().with_cooldown(Duration::ZERO),
    );

    let err = failover.generate("q", "ctx").await.unwrap_err();

    assert!(matches!(err, FailoverError::Unavailable));
    assert_eq!(only.calls(), 1);
}

#[tokio::test]
async fn test_empty_chain_is_unavailable() {
    let failover = FailoverController::new(Vec::new(), FailoverConfig::default());
    assert!(failover.is_empty());
    assert!(matches!(
        failover.generate("q", "ctx").await,
        Err(FailoverError::Unavailable)
    ));
}

#[rstest]
#[case(ProviderError::invalid_request("context too long"))]
#[case(ProviderError::MalformedResponse("no choices".to_string()))]
#[tokio::test]
async fn test_non_provider_error_does_not_fail_over(#[case] error: ProviderError) {
    let primary = ScriptedGenerator::new("primary");
    primary.push_error(error);
    let primary = Arc::new(primary);
    let secondary = ScriptedGenerator::healthy("secondary");
    let failover = controller(&[&primary, &secondary], FailoverConfig::default());

    let err = failover.generate("q", "ctx").await.unwrap_err();

    match err {
        FailoverError::Rejected { provider_id, .. } => assert_eq!(provider_id, "primary"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(secondary.calls(), 0);
    assert_eq!(failover.states()[0].status, ProviderStatus::Available);
    assert_eq!(failover.states()[0].last_failure, None);
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_times_out_and_fails_over() {
    let primary = ScriptedGenerator::slow("primary", Duration::from_secs(120));
    let secondary = ScriptedGenerator::healthy("secondary");
    let failover = controller(
        &[&primary, &secondary],
        FailoverConfig::default().with_attempt_timeout(Duration::from_secs(5)),
    );

    let answer = failover.generate("q", "ctx").await.unwrap();

    assert_eq!(answer.provider_id, "secondary");
    assert_eq!(
        failover.states()[0].last_failure,
        Some(FailureKind::Timeout)
    );
}

#[tokio::test]
async fn test_context_reaches_provider() {
    let primary = ScriptedGenerator::healthy("primary");
    let failover = controller(&[&primary], FailoverConfig::default());

    failover.generate("q", "Context 1:\nDeductible\n").await.unwrap();

    assert_eq!(primary.contexts(), vec!["Context 1:\nDeductible\n".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_share_state() {
    let primary = ScriptedGenerator::failing("primary", FailureKind::RateLimited);
    let secondary = ScriptedGenerator::healthy("secondary");
    let failover = Arc::new(controller(&[&primary, &secondary], FailoverConfig::default()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let failover = Arc::clone(&failover);
            tokio::spawn(async move { failover.generate(&format!("q{}", i), "ctx").await })
        })
        .collect();

    for handle in handles {
        let answer = handle.await.unwrap().unwrap();
        assert_eq!(answer.provider_id, "secondary");
    }
    assert_eq!(failover.states()[0].status, ProviderStatus::Cooling);
    assert!(primary.calls() >= 1);
    assert_eq!(secondary.calls(), 8);
}
