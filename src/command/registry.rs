use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::command::{Command, Receiver};
use crate::core::{DispatchError, Result};

type CommandFactory =
    dyn Fn(&[String], &BTreeMap<String, String>) -> Result<Box<dyn Command>> + Send + Sync;

/// Registry entry for one command name: the argument parser shown to
/// interact surfaces plus the factory that builds the command from a
/// parsed receiver.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub parser: clap::Command,
    factory: Arc<CommandFactory>,
}

impl CommandDescriptor {
    /// Build a fresh command instance from the supplied arguments.
    pub fn build(
        &self,
        args: &[String],
        kwargs: &BTreeMap<String, String>,
    ) -> Result<Box<dyn Command>> {
        (self.factory)(args, kwargs)
    }
}

/// Directory of registered commands, shared via `Arc` with every engine
/// and interface that resolves names.
///
/// Registration normally happens once at startup; `get` is on the hot
/// dispatch path. Re-registering a name replaces the prior descriptor.
///
/// Parsed values travel as `BTreeMap<String, String>` keyword arguments;
/// arguments with non-string typed values are dropped at flattening.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, CommandDescriptor>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as command type `C` built from receiver type `R`,
    /// with `parser` as its console argument grammar. Last registration
    /// for a name wins.
    pub fn register<C, R>(&self, name: &str, parser: clap::Command) -> Result<()>
    where
        C: Command + From<R> + 'static,
        R: Receiver + 'static,
    {
        let factory: Arc<CommandFactory> = Arc::new(|args, kwargs| {
            let receiver = R::from_args(args, kwargs)?;
            Ok(Box::new(C::from(receiver)) as Box<dyn Command>)
        });
        let mut commands = self.commands.write()?;
        commands.insert(name.to_string(), CommandDescriptor { parser, factory });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<CommandDescriptor> {
        let commands = self.commands.read()?;
        commands
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::CommandNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands
            .read()
            .map(|commands| commands.contains_key(name))
            .unwrap_or(false)
    }
}

/// Flatten parsed matches into the keyword-argument map an envelope
/// carries. Positional arguments land here too, keyed by their id;
/// arguments whose parser produced a non-string value are skipped so a
/// plug-in's parser choice cannot panic the listener.
pub fn matches_to_kwargs(matches: &clap::ArgMatches) -> BTreeMap<String, String> {
    matches
        .ids()
        .filter_map(|id| {
            matches
                .try_get_one::<String>(id.as_str())
                .ok()
                .flatten()
                .map(|value| (id.as_str().to_string(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutcome;
    use async_trait::async_trait;

    struct Marker(String);

    impl Receiver for Marker {
        fn from_args(args: &[String], _kwargs: &BTreeMap<String, String>) -> Result<Self> {
            Ok(Self(args.join(" ")))
        }
    }

    struct First(#[allow(dead_code)] Marker);
    struct Second(#[allow(dead_code)] Marker);

    impl From<Marker> for First {
        fn from(marker: Marker) -> Self {
            Self(marker)
        }
    }

    impl From<Marker> for Second {
        fn from(marker: Marker) -> Self {
            Self(marker)
        }
    }

    #[async_trait]
    impl Command for First {
        async fn execute(&mut self) -> Result<CommandOutcome> {
            Ok(CommandOutcome::ok("first"))
        }
    }

    #[async_trait]
    impl Command for Second {
        async fn execute(&mut self) -> Result<CommandOutcome> {
            Ok(CommandOutcome::ok("second"))
        }
    }

    #[tokio::test]
    async fn reregistration_replaces_descriptor() {
        let registry = CommandRegistry::new();
        registry
            .register::<First, Marker>("probe", clap::Command::new("probe"))
            .unwrap();
        registry
            .register::<Second, Marker>("probe", clap::Command::new("probe"))
            .unwrap();

        let descriptor = registry.get("probe").unwrap();
        let mut command = descriptor.build(&[], &BTreeMap::new()).unwrap();
        let outcome = command.execute().await.unwrap();
        assert_eq!(outcome.message, "second");
    }

    #[test]
    fn missing_name_is_command_not_found() {
        let registry = CommandRegistry::new();
        match registry.get("nope") {
            Err(DispatchError::CommandNotFound(name)) => assert_eq!(name, "nope"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("lookup unexpectedly succeeded"),
        }
    }

    #[test]
    fn kwargs_include_defaults_and_positionals() {
        let parser = clap::Command::new("probe")
            .arg(clap::Arg::new("target").required(true))
            .arg(
                clap::Arg::new("mode")
                    .long("mode")
                    .default_value("fast"),
            );
        let matches = parser
            .try_get_matches_from(["probe", "unit-7"])
            .unwrap();
        let kwargs = matches_to_kwargs(&matches);
        assert_eq!(kwargs.get("target").map(String::as_str), Some("unit-7"));
        assert_eq!(kwargs.get("mode").map(String::as_str), Some("fast"));
    }

    #[test]
    fn non_string_arguments_are_skipped_not_fatal() {
        let parser = clap::Command::new("probe")
            .arg(clap::Arg::new("target").required(true))
            .arg(
                clap::Arg::new("verbose")
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                clap::Arg::new("count")
                    .long("count")
                    .value_parser(clap::value_parser!(u32)),
            );
        let matches = parser
            .try_get_matches_from(["probe", "unit-7", "--verbose", "--count", "3"])
            .unwrap();
        let kwargs = matches_to_kwargs(&matches);
        assert_eq!(kwargs.get("target").map(String::as_str), Some("unit-7"));
        assert!(!kwargs.contains_key("verbose"));
        assert!(!kwargs.contains_key("count"));
    }
}
