// Header grouping CLI - replay header scripts and check saved group state

mod exit_codes;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;
use gridgroup_cli::{render_header, Script, ScriptError};
use gridgroup_config::GroupSettings;
use gridgroup_core::{Axis, AxisView};
use gridgroup_engine::{GroupHeader, GroupModelState};

use exit_codes::{
    EXIT_ERROR, EXIT_REPLAY_REJECTED, EXIT_REPLAY_SCRIPT_ERROR, EXIT_REPLAY_UNKNOWN_GROUP, EXIT_SETTINGS_ERROR,
    EXIT_STATE_INVALID, EXIT_STATE_PARSE, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "ggroup")]
#[command(about = "Replay header grouping scripts and check saved group state")]
#[command(version)]
struct Cli {
    /// Log to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a header script against an in-memory axis and print the header
    #[command(after_help = "\
Examples:
  ggroup replay person.toml
  ggroup replay person.json --state > groups.json
  ggroup replay person.json --settings strict.toml --strict")]
    Replay {
        /// Script file (.toml, anything else is read as JSON)
        script: PathBuf,

        /// Print the saved group state as JSON instead of the header
        #[arg(long)]
        state: bool,

        /// Settings file, overriding the script and the user settings
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Fail if the engine rejected any step
        #[arg(long)]
        strict: bool,

        /// Quiet mode - only print errors
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a saved group state and print the header it produces
    Check {
        /// State file written by `replay --state`
        state: PathBuf,

        /// Number of indices on the axis the state is loaded into
        #[arg(long)]
        axis_len: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Replay { script, state, settings, strict, quiet } => cmd_replay(script, state, settings, strict, quiet),
        Commands::Check { state, axis_len } => cmd_check(state, axis_len),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr so stdout stays clean for `--state` output.
/// Records from the library crates arrive through the `log` bridge.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .without_time()
        .init();
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ScriptError> for CliError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::Read { .. } => CliError::usage(err.to_string()),
            ScriptError::Json(_) | ScriptError::Toml(_) => CliError::new(EXIT_REPLAY_SCRIPT_ERROR, err.to_string())
                .with_hint("every op needs an \"op\" field, e.g. { \"op\": \"collapse\", \"group\": \"Person\" }"),
            ScriptError::UnknownName { .. } => CliError::new(EXIT_REPLAY_UNKNOWN_GROUP, err.to_string())
                .with_hint("groups are looked up by name at the step that uses them"),
        }
    }
}

// ============================================================================
// replay
// ============================================================================

fn cmd_replay(
    script_path: PathBuf,
    print_state: bool,
    settings_path: Option<PathBuf>,
    strict: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let script = Script::load(&script_path)?;

    let settings = match settings_path {
        Some(path) => GroupSettings::load_from(&path).map_err(|e| CliError::new(EXIT_SETTINGS_ERROR, e.to_string()))?,
        None => script.settings.clone().unwrap_or_else(GroupSettings::load),
    };
    tracing::debug!("settings: {:?}", settings);

    let replay = gridgroup_cli::run(&script, settings)?;

    if print_state {
        let json = replay
            .header
            .save_state()
            .to_json()
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot serialize state: {}", e)))?;
        println!("{}", json);
    } else {
        print!("{}", replay.render());
    }

    let rejected: Vec<_> = replay.rejected().collect();
    if !quiet {
        for step in &rejected {
            eprintln!(
                "rejected: step {} ({}): {}",
                step.step,
                step.op,
                step.rejected.as_deref().unwrap_or_default()
            );
        }
        eprintln!(
            "Replayed {} step(s), {} rejected, {} event(s)",
            replay.steps.len(),
            rejected.len(),
            replay.events()
        );
    }

    if strict && !rejected.is_empty() {
        return Err(CliError::new(
            EXIT_REPLAY_REJECTED,
            format!("{} step(s) rejected", rejected.len()),
        )
        .with_hint("run without --strict to see the resulting header anyway"));
    }
    Ok(())
}

// ============================================================================
// check
// ============================================================================

fn cmd_check(state_path: PathBuf, axis_len: usize) -> Result<(), CliError> {
    let contents = fs::read_to_string(&state_path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {}", state_path.display(), e)))?;
    let state = GroupModelState::from_json(&contents)
        .map_err(|e| CliError::new(EXIT_STATE_PARSE, format!("invalid state JSON: {}", e)))?;

    let mut header = GroupHeader::new(Axis::Column, AxisView::new(axis_len));
    header
        .load_state(&state)
        .map_err(|e| CliError::new(EXIT_STATE_INVALID, e.to_string()).with_hint("is --axis-len the axis the state was saved from?"))?;

    print!("{}", render_header(&header));
    for group in header.model().groups() {
        println!(
            "{} '{}': {} member(s), {} static, span {}{}{}",
            group.id(),
            group.name(),
            group.members().len(),
            group.static_members().len(),
            group.visible_span(header.converter()),
            if group.is_collapsed() { ", collapsed" } else { "" },
            if group.is_unbreakable() { ", unbreakable" } else { "" },
        );
    }
    Ok(())
}
