use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::command::{Command, CommandOutcome, CommandRegistry, Receiver};
use crate::core::{DispatchError, Result};

/// Arguments for the `echo` command.
pub struct EchoPayload {
    pub text: String,
    pub repeat: usize,
}

impl Receiver for EchoPayload {
    fn from_args(args: &[String], kwargs: &BTreeMap<String, String>) -> Result<Self> {
        let text = kwargs
            .get("text")
            .cloned()
            .or_else(|| (!args.is_empty()).then(|| args.join(" ")))
            .ok_or_else(|| DispatchError::InvalidArgument("echo needs text".into()))?;
        let repeat = match kwargs.get("repeat") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| DispatchError::InvalidArgument(format!("bad repeat count \"{raw}\"")))?,
            None => 1,
        };
        Ok(Self { text, repeat })
    }
}

/// Trivial reference plug-in: echoes its text back, optionally repeated.
pub struct Echo {
    payload: EchoPayload,
}

impl From<EchoPayload> for Echo {
    fn from(payload: EchoPayload) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl Command for Echo {
    async fn execute(&mut self) -> Result<CommandOutcome> {
        let echoed = vec![self.payload.text.clone(); self.payload.repeat.max(1)].join(" ");
        Ok(CommandOutcome::ok(echoed))
    }
}

pub fn parser() -> clap::Command {
    clap::Command::new("echo")
        .about("Echo text back through the originating interface")
        .arg(clap::Arg::new("text").required(true).help("Text to echo"))
        .arg(
            clap::Arg::new("repeat")
                .short('r')
                .long("repeat")
                .default_value("1")
                .help("Number of repetitions"),
        )
}

pub fn register(registry: &CommandRegistry) -> Result<()> {
    registry.register::<Echo, EchoPayload>("echo", parser())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_repeats_text() {
        let kwargs = BTreeMap::from([
            ("text".to_string(), "ping".to_string()),
            ("repeat".to_string(), "3".to_string()),
        ]);
        let payload = EchoPayload::from_args(&[], &kwargs).unwrap();
        let mut command = Echo::from(payload);
        let outcome = command.execute().await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "ping ping ping");
    }

    #[test]
    fn bad_repeat_count_is_rejected() {
        let kwargs = BTreeMap::from([
            ("text".to_string(), "ping".to_string()),
            ("repeat".to_string(), "many".to_string()),
        ]);
        assert!(matches!(
            EchoPayload::from_args(&[], &kwargs),
            Err(DispatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn undo_is_refused() {
        let payload = EchoPayload {
            text: "x".into(),
            repeat: 1,
        };
        let mut command = Echo::from(payload);
        assert!(!command.can_undo());
        let err = tokio_test::block_on(command.undo()).unwrap_err();
        assert!(matches!(err, DispatchError::FailedOperation { .. }));
    }
}
