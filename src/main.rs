mod cli;
mod commands;
mod config;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

use azdokit::{ErrorCategory, RefUpdateStrategy};

/// Global context for the application
#[derive(Default)]
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
    pub org_url: Option<String>,
    pub timeout: Option<u64>,
    pub update_strategy: Option<RefUpdateStrategy>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        org_url: cli.org_url,
        timeout: cli.timeout,
        update_strategy: cli.update_strategy.map(Into::into),
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&ctx, &e);
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::ClientConfig => commands::client_config::run(ctx),
        Command::Project(cmd) => commands::project::run(ctx, cmd),
        Command::Repo(cmd) => commands::repository::run(ctx, cmd),
        Command::Branch(cmd) => commands::branch::run(ctx, cmd),
        Command::Config(cmd) => commands::config::run(ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "azdo", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print the error chain, plus advice when the cause is a service error
fn report_error(ctx: &Context, err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));

    let Some(cause) = err.chain().find_map(|e| e.downcast_ref::<azdokit::Error>()) else {
        return;
    };
    let category = cause.category();
    if ctx.verbose > 0 {
        eprintln!("  {}", category_line(category));
    }
    if !ctx.quiet {
        eprintln!("  {}", category.advice());
    }
}

fn category_line(category: ErrorCategory) -> String {
    format!("{category:?}: {category}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_line_names_category_once() {
        let line = category_line(ErrorCategory::RefNotFound);
        let description = ErrorCategory::RefNotFound.description();
        assert_eq!(line, format!("RefNotFound: {description}"));
        assert_eq!(line.matches(description).count(), 1);
    }
}
