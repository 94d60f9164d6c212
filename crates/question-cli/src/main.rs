use clap::{Parser, Subcommand, ValueEnum};
use question_core::{QuestionConfig, config_schema};
use question_host::run_scenario;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Question composer scenario runner",
    long_about = "Drives a question composer on an in-memory host from a JSON script and prints the resulting layout"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scenario script and print the final element tree and states.
    Run {
        /// Path to the scenario script JSON.
        #[arg(long, value_name = "SCRIPT")]
        script: PathBuf,
        /// Optional JSON file with the question configuration.
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
        /// Output format for the report.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Log composer decisions to stderr.
        #[arg(long, alias = "debug")]
        verbose: bool,
    },
    /// Print the JSON schema of the question configuration.
    Schema,
    /// Check a configuration file and print the effective settings.
    CheckConfig {
        /// Path to the configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            script,
            config,
            format,
            verbose,
        } => {
            init_tracing(verbose);
            run(&script, config.as_deref(), format)
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&config_schema())?);
            Ok(())
        }
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_config(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok(String::new()),
    }
}

fn run(script_path: &Path, config_path: Option<&Path>, format: OutputFormat) -> CliResult<()> {
    let script_json = fs::read_to_string(script_path)?;
    let config_json = read_config(config_path)?;
    debug!(script = %script_path.display(), "running scenario");

    let scenario = run_scenario(&script_json, &config_json)?;
    match format {
        OutputFormat::Text => println!("{}", scenario.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&scenario.report())?),
    }
    Ok(())
}

fn check_config(path: &Path) -> CliResult<()> {
    let config_json = fs::read_to_string(path)?;
    let config = QuestionConfig::from_json(&config_json)?;
    let order = config
        .order
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    println!("Config valid");
    println!("Order: {order}");
    println!("Class prefix: {}", config.class_prefix);
    println!("Transition: {}ms", config.transition_ms);
    if let Some(base) = &config.base_path {
        println!("Base path: {base}");
    }
    if let Some(content_id) = &config.content_id {
        println!("Content id: {content_id}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_config_defaults_to_blank() {
        assert_eq!(read_config(None).expect("blank"), "");
    }

    #[test]
    fn read_config_surfaces_missing_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        assert!(read_config(Some(dir.path().join("absent.json").as_path())).is_err());
    }
}
