use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use cmdrelay::command::{CommandHandler, matches_to_kwargs};
use cmdrelay::interact::{console_factory, render_outcome};
use cmdrelay::plugins;
use cmdrelay::{
    CommandEngine, CommandOutcome, CommandRegistry, EngineConfig, InteractConfig, InteractEngine,
    InterfaceRegistry,
};

#[derive(Parser)]
#[command(
    name = "cmdrelay",
    about = "Asynchronous command-dispatch runtime",
    arg_required_else_help = false
)]
struct Cli {
    /// Interact configuration file (JSON); runs the full engine stack
    #[arg(long, conflicts_with = "command")]
    config: Option<PathBuf>,

    /// Execute one command and exit; remaining tokens go to the
    /// command's own argument parser
    #[arg(long, num_args = 1.., value_name = "NAME [ARGS]...", allow_hyphen_values = true)]
    command: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let commands = Arc::new(CommandRegistry::new());
    plugins::register_builtins(&commands)?;

    match (cli.config, cli.command) {
        (Some(path), _) => run_engines(path, commands).await,
        (None, Some(tokens)) => run_one_shot(&tokens, &commands).await,
        (None, None) => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// One-shot flow: resolve, parse, execute with no retries, print.
async fn run_one_shot(tokens: &[String], commands: &CommandRegistry) -> anyhow::Result<()> {
    let name = tokens.first().context("--command needs a command name")?;
    let descriptor = commands.get(name)?;
    let matches = descriptor.parser.clone().try_get_matches_from(tokens)?;
    let kwargs = matches_to_kwargs(&matches);

    let mut handler = CommandHandler::new(commands, name, &[], &kwargs, 0)?;
    let outcome = match handler.execute().await {
        Ok(outcome) => outcome,
        Err(err) => CommandOutcome::from_error(&err),
    };
    let shown_args: Vec<String> = kwargs
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    println!("{}", render_outcome(&outcome, name, &shown_args));
    Ok(())
}

/// Full flow: wire both engines and run them until interrupted.
async fn run_engines(path: PathBuf, commands: Arc<CommandRegistry>) -> anyhow::Result<()> {
    let config = InteractConfig::from_file(&path)
        .with_context(|| format!("loading interact config {}", path.display()))?;

    let engine = Arc::new(CommandEngine::new(
        Arc::clone(&commands),
        EngineConfig::default(),
    ));
    let interfaces = Arc::new(InterfaceRegistry::new(console_factory(Arc::clone(
        &commands,
    ))));
    interfaces.add_queues(engine.command_queue(), engine.result_queue())?;

    let interact = Arc::new(InteractEngine::new(
        config,
        interfaces,
        commands,
        EngineConfig::default().supervision_interval,
    ));

    tokio::join!(engine.run(), interact.run());
    Ok(())
}
