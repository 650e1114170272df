//! Planroom CLI entry point.

use clap::Parser;
use planroom::cli::commands;
use planroom::cli::{Cli, Commands, OutputFormat};
use planroom::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.silent {
        planroom::SILENT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.dry_run {
        planroom::DRY_RUN.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.format == OutputFormat::Csv {
        planroom::CSV_OUTPUT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR --format json OR non-TTY stdout.
    // CSV wins over the non-TTY fallback when asked for explicitly.
    let json = cli.json
        || cli.format == OutputFormat::Json
        || (cli.format != OutputFormat::Csv && !std::io::IsTerminal::is_terminal(&std::io::stdout()));

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let actor = cli.actor.as_deref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, *force, json),
        Commands::Version => commands::version::execute(json),

        Commands::Project { command } => commands::project::execute(command, db, actor, json),
        Commands::Folder { command } => commands::folder::execute(command, db, actor, json),
        Commands::File { command } => commands::file::execute(command, db, actor, json),
        Commands::Task { command } => commands::task::execute(command, db, actor, json),

        // AI tool calls
        Commands::Tool { command } => commands::tool::execute(command, db, actor, json),

        // Audit log
        Commands::History(args) => commands::history::execute(args, db, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
