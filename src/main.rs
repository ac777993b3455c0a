//! Tabula - run edit scripts against a spreadsheet from the command line

mod script;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tabula_core::{InvalidationPolicy, Sheet, SheetConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tabula", version, about = "Formula-driven spreadsheet engine")]
struct Cli {
    /// Edit script to run; reads stdin when omitted
    script: Option<PathBuf>,

    /// Run a single command instead of a script (can be repeated)
    #[arg(short = 'c', long = "command", value_name = "CMD")]
    commands: Vec<String>,

    /// Config file (defaults to config.toml in the user config dir)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// What editing a cell does to the cells that read it
    #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
    policy: Option<InvalidationPolicy>,

    /// Print cell texts instead of values after the script
    #[arg(long)]
    texts: bool,

    /// Do not print the sheet after the script
    #[arg(short, long)]
    quiet: bool,

    /// Report failing commands and continue
    #[arg(long)]
    keep_going: bool,
}

fn parse_policy(s: &str) -> std::result::Result<InvalidationPolicy, String> {
    s.parse()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<SheetConfig> {
    let mut config = match &cli.config {
        Some(path) => SheetConfig::load(path)?,
        None => SheetConfig::load_user()?,
    };
    if let Some(policy) = cli.policy {
        config.invalidation = policy;
    }
    Ok(config)
}

fn read_script(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read script from stdin")?;
            Ok(content)
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let mut sheet = Sheet::with_config(config);
    tracing::debug!(invalidation = %sheet.config().invalidation, "starting");

    let command_mode = !cli.commands.is_empty();
    let lines: Vec<String> = if command_mode {
        cli.commands.clone()
    } else {
        read_script(cli.script.as_ref())?
            .lines()
            .map(str::to_string)
            .collect()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0usize;

    for (index, line) in lines.iter().enumerate() {
        let result = script::parse_line(line).and_then(|command| match command {
            Some(command) => script::execute(&mut sheet, &command, &mut out),
            None => Ok(()),
        });
        if let Err(err) = result {
            let err = err.context(format!("line {}", index + 1));
            if !cli.keep_going {
                return Err(err);
            }
            eprintln!("Error: {:#}", err);
            failures += 1;
        }
    }

    if !command_mode && !cli.quiet {
        if cli.texts {
            sheet.print_texts(&mut out)?;
        } else {
            sheet.print_values(&mut out)?;
        }
    }
    out.flush()?;

    if failures > 0 {
        bail!("{} command(s) failed", failures);
    }
    Ok(())
}
