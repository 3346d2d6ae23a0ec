/// Command handler tests
///
/// Retry, short-circuit, and compensating-undo semantics of the
/// CommandHandler.
/// Run with: cargo test --test handler_tests
use std::collections::BTreeMap;

use async_trait::async_trait;
use cmdrelay::command::CommandHandler;
use cmdrelay::{Command, CommandOutcome, CommandRegistry, DispatchError, Receiver, Result};
use tokio_test::assert_ok;

/// Fails with a retriable error `fail_times` times, then succeeds.
struct FlakySpec {
    fail_times: usize,
}

impl Receiver for FlakySpec {
    fn from_args(_args: &[String], kwargs: &BTreeMap<String, String>) -> Result<Self> {
        let fail_times = kwargs
            .get("fail_times")
            .map(|raw| raw.parse::<usize>().unwrap_or(0))
            .unwrap_or(0);
        Ok(Self { fail_times })
    }
}

struct FlakyCommand {
    spec: FlakySpec,
    attempts: usize,
}

impl From<FlakySpec> for FlakyCommand {
    fn from(spec: FlakySpec) -> Self {
        Self { spec, attempts: 0 }
    }
}

#[async_trait]
impl Command for FlakyCommand {
    async fn execute(&mut self) -> Result<CommandOutcome> {
        self.attempts += 1;
        if self.attempts <= self.spec.fail_times {
            Err(DispatchError::Retriable(format!(
                "attempt {} failed",
                self.attempts
            )))
        } else {
            Ok(CommandOutcome::ok(format!(
                "succeeded on attempt {}",
                self.attempts
            )))
        }
    }
}

/// Always fails retriably; undo succeeds and reports how often it ran.
struct RollbackSpec;

impl Receiver for RollbackSpec {
    fn from_args(_args: &[String], _kwargs: &BTreeMap<String, String>) -> Result<Self> {
        Ok(Self)
    }
}

struct RollbackCommand {
    undo_calls: usize,
}

impl From<RollbackSpec> for RollbackCommand {
    fn from(_spec: RollbackSpec) -> Self {
        Self { undo_calls: 0 }
    }
}

#[async_trait]
impl Command for RollbackCommand {
    fn can_undo(&self) -> bool {
        true
    }

    async fn execute(&mut self) -> Result<CommandOutcome> {
        Err(DispatchError::Retriable("still broken".into()))
    }

    async fn undo(&mut self) -> Result<CommandOutcome> {
        self.undo_calls += 1;
        Ok(CommandOutcome::ok(format!("undo#{}", self.undo_calls)))
    }
}

/// Fails immediately with a non-retriable error.
struct BrokenSpec;

impl Receiver for BrokenSpec {
    fn from_args(_args: &[String], _kwargs: &BTreeMap<String, String>) -> Result<Self> {
        Ok(Self)
    }
}

struct BrokenCommand {
    attempts: usize,
}

impl From<BrokenSpec> for BrokenCommand {
    fn from(_spec: BrokenSpec) -> Self {
        Self { attempts: 0 }
    }
}

#[async_trait]
impl Command for BrokenCommand {
    async fn execute(&mut self) -> Result<CommandOutcome> {
        self.attempts += 1;
        Err(DispatchError::InvalidArgument(format!(
            "boom on attempt {}",
            self.attempts
        )))
    }
}

fn test_registry() -> CommandRegistry {
    let registry = CommandRegistry::new();
    registry
        .register::<FlakyCommand, FlakySpec>("flaky", clap::Command::new("flaky"))
        .unwrap();
    registry
        .register::<RollbackCommand, RollbackSpec>("rollback", clap::Command::new("rollback"))
        .unwrap();
    registry
        .register::<BrokenCommand, BrokenSpec>("broken", clap::Command::new("broken"))
        .unwrap();
    registry
}

fn kwargs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[tokio::test]
async fn success_short_circuits_remaining_retries() {
    let registry = test_registry();
    let mut handler =
        CommandHandler::new(&registry, "flaky", &[], &kwargs(&[("fail_times", "2")]), 3).unwrap();

    let outcome = assert_ok!(handler.execute().await);
    assert!(outcome.success);
    assert_eq!(outcome.message, "succeeded on attempt 3");
}

#[tokio::test]
async fn exhaustion_reports_retry_count_and_every_error() {
    let registry = test_registry();
    let mut handler =
        CommandHandler::new(&registry, "flaky", &[], &kwargs(&[("fail_times", "10")]), 2).unwrap();

    match handler.execute().await {
        Err(DispatchError::FailedOperation {
            message,
            undo_result,
        }) => {
            assert!(message.contains("after 2 retries"), "message: {message}");
            // retry_limit + 1 attempts, each recorded
            assert!(message.contains("'attempt 1 failed'"));
            assert!(message.contains("'attempt 3 failed'"));
            assert!(!message.contains("attempt 4"));
            assert!(undo_result.is_none());
        }
        other => panic!("expected FailedOperation, got {other:?}"),
    }
}

#[tokio::test]
async fn undo_runs_exactly_once_and_rides_along() {
    let registry = test_registry();
    let mut handler =
        CommandHandler::new(&registry, "rollback", &[], &BTreeMap::new(), 1).unwrap();

    match handler.execute().await {
        Err(DispatchError::FailedOperation { undo_result, .. }) => {
            let undo = undo_result.expect("undo outcome must be attached");
            assert!(undo.success);
            assert_eq!(undo.message, "undo#1");
        }
        other => panic!("expected FailedOperation, got {other:?}"),
    }
}

#[tokio::test]
async fn non_retriable_error_propagates_immediately() {
    let registry = test_registry();
    let mut handler = CommandHandler::new(&registry, "broken", &[], &BTreeMap::new(), 5).unwrap();

    match handler.execute().await {
        Err(DispatchError::InvalidArgument(message)) => {
            assert_eq!(message, "boom on attempt 1");
        }
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_command_fails_construction() {
    let registry = test_registry();
    let result = CommandHandler::new(&registry, "missing", &[], &BTreeMap::new(), 0);
    assert!(matches!(
        result.err(),
        Some(DispatchError::CommandNotFound(name)) if name == "missing"
    ));
}

#[tokio::test]
async fn zero_retry_limit_allows_a_single_attempt() {
    let registry = test_registry();
    let mut handler =
        CommandHandler::new(&registry, "flaky", &[], &kwargs(&[("fail_times", "1")]), 0).unwrap();

    match handler.execute().await {
        Err(DispatchError::FailedOperation { message, .. }) => {
            assert!(message.contains("after 0 retries"), "message: {message}");
        }
        other => panic!("expected FailedOperation, got {other:?}"),
    }
}
