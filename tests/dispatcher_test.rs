use std::time::Duration;

use sales_reporter::dispatcher::{
    DeliveryState, Dispatcher, MailTransport, OutgoingMessage, RetryPolicy, TransportError,
};
use sales_reporter::models::ReportArtifact;

/// Transport scripted with a fixed sequence of outcomes
struct ScriptedTransport {
    script: Vec<Result<(), TransportError>>,
    sends: usize,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<(), TransportError>>) -> Self {
        Self { script, sends: 0 }
    }
}

impl MailTransport for ScriptedTransport {
    fn send(&mut self, _message: &OutgoingMessage<'_>) -> Result<(), TransportError> {
        let outcome = self
            .script
            .get(self.sends)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Transient("script exhausted".to_string())));
        self.sends += 1;
        outcome
    }
}

fn artifact() -> ReportArtifact {
    ReportArtifact {
        file_name: "sales_report_20250101_20250102.csv".to_string(),
        digest: "SALES REPORT - SUMMARY".to_string(),
        table: "Date,Customer\n".to_string(),
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: Duration::ZERO,
    }
}

fn recipients() -> Vec<String> {
    vec!["sales@example.com".to_string()]
}

fn transient() -> Result<(), TransportError> {
    Err(TransportError::Transient("connection reset".to_string()))
}

fn permanent() -> Result<(), TransportError> {
    Err(TransportError::Permanent("mailbox unavailable".to_string()))
}

#[test]
fn test_first_attempt_success_sends_exactly_once() {
    let mut dispatcher = Dispatcher::new(ScriptedTransport::new(vec![Ok(())]), policy());

    let result = dispatcher.deliver(&artifact(), &recipients(), "SALES REPORT");

    assert!(result.delivered);
    assert_eq!(result.attempts, 1);
    assert!(result.error.is_none());
}

#[test]
fn test_transient_failures_then_success() {
    let transport = ScriptedTransport::new(vec![transient(), Ok(())]);
    let mut dispatcher = Dispatcher::new(transport, policy());

    let result = dispatcher.deliver(&artifact(), &recipients(), "SALES REPORT");

    assert!(result.delivered);
    assert_eq!(result.attempts, 2);
}

#[test]
fn test_retry_budget_never_exceeds_three_attempts() {
    let transport = ScriptedTransport::new(vec![transient(), transient(), transient(), Ok(())]);
    let mut dispatcher = Dispatcher::new(transport, policy());

    let result = dispatcher.deliver(&artifact(), &recipients(), "SALES REPORT");

    // The fourth (would-succeed) attempt never happens
    assert!(!result.delivered);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.error.as_deref(), Some("connection reset"));
}

#[test]
fn test_permanent_failure_stops_immediately() {
    let transport = ScriptedTransport::new(vec![permanent(), Ok(())]);
    let mut dispatcher = Dispatcher::new(transport, policy());

    let result = dispatcher.deliver(&artifact(), &recipients(), "SALES REPORT");

    assert!(!result.delivered);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.error.as_deref(), Some("mailbox unavailable"));
}

#[test]
fn test_empty_recipient_list_rejected_before_any_attempt() {
    let mut dispatcher = Dispatcher::new(ScriptedTransport::new(vec![Ok(())]), policy());

    let result = dispatcher.deliver(&artifact(), &[], "SALES REPORT");

    assert!(!result.delivered);
    assert_eq!(result.attempts, 0);
    assert!(result.error.is_some());
}

#[test]
fn test_invalid_recipient_rejected_before_any_attempt() {
    let mut dispatcher = Dispatcher::new(ScriptedTransport::new(vec![Ok(())]), policy());

    let result = dispatcher.deliver(&artifact(), &["not-an-address".to_string()], "SALES REPORT");

    assert!(!result.delivered);
    assert_eq!(result.attempts, 0);
}

#[test]
fn test_delivery_state_transitions() {
    let state = DeliveryState::start();
    assert_eq!(state, DeliveryState::Attempting { attempt: 1 });
    assert!(!state.is_terminal());

    // Success from any attempt is terminal
    let state = DeliveryState::start().advance(Ok(()), 3);
    assert_eq!(state, DeliveryState::Succeeded { attempts: 1 });
    assert!(state.is_terminal());

    // Transient failures increment until the budget runs out
    let state = DeliveryState::start().advance(transient(), 3);
    assert_eq!(state, DeliveryState::Attempting { attempt: 2 });
    let state = state.advance(transient(), 3);
    assert_eq!(state, DeliveryState::Attempting { attempt: 3 });
    let state = state.advance(transient(), 3);
    assert_eq!(
        state,
        DeliveryState::Exhausted {
            attempts: 3,
            last_error: "connection reset".to_string(),
        }
    );
    assert!(state.is_terminal());

    // A permanent failure ends the sequence on the spot
    let state = DeliveryState::start().advance(permanent(), 3);
    assert!(matches!(state, DeliveryState::Rejected { attempts: 1, .. }));
    assert!(state.is_terminal());
}

#[test]
fn test_terminal_states_ignore_further_outcomes() {
    let state = DeliveryState::Succeeded { attempts: 2 };
    let after = state.clone().advance(transient(), 3);
    assert_eq!(state, after);
}

#[test]
fn test_default_policy_matches_documented_budget() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.backoff, Duration::from_secs(5));
}
