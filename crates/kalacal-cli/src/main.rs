use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use kalacal_core::PatientInput;
use tracing_subscriber::EnvFilter;

use kalacal_cli::commands;
use kalacal_cli::config::{self, KalacalConfig};

#[derive(Parser)]
#[command(name = "kalacal", version, about = "Kala-Cal SHAP explanation client")]
struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true, env = "KALACAL_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List prediction models.
    Models,
    /// List clinical input fields.
    Fields,
    /// Check patient data locally without calling the service.
    Validate(PatientArgs),
    /// Request a SHAP explanation.
    Explain {
        #[command(flatten)]
        patient: PatientArgs,
        /// Write the decoded SHAP chart to this file.
        #[arg(long)]
        chart: Option<PathBuf>,
    },
    /// Probe the prediction service.
    Health,
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective config with secrets redacted.
    Show,
    /// Write a default `config.json`, into the directory of `--config` when given.
    Init {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[derive(Args)]
struct PatientArgs {
    /// Model id; the server picks one when omitted.
    #[arg(long)]
    model: Option<String>,
    /// JSON object of patient fields.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Field assignments such as `peso=65.5`, applied over `--input`.
    #[arg(value_name = "NAME=VALUE")]
    values: Vec<String>,
}

impl PatientArgs {
    fn patient_input(&self) -> eyre::Result<PatientInput> {
        let mut input = match &self.input {
            Some(path) => read_input(path)?,
            None => PatientInput::new(),
        };
        for assignment in &self.values {
            let (name, value) = PatientInput::parse_assignment(assignment)?;
            input.insert(name, value);
        }
        Ok(input)
    }
}

fn read_input(path: &Path) -> eyre::Result<PatientInput> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read input at {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let cfg = config::resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Models => print!("{}", commands::render_models(&config::load_catalog(&cfg)?)),
        Command::Fields => print!("{}", commands::render_fields(&config::load_catalog(&cfg)?)),
        Command::Validate(patient) => {
            let catalog = config::load_catalog(&cfg)?;
            let input = patient.patient_input()?;
            match commands::render_validation(&catalog, &input, patient.model.as_deref()) {
                Ok(line) => println!("{line}"),
                Err(report) => {
                    eprint!("{report}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Explain { patient, chart } => {
            let catalog = config::load_catalog(&cfg)?;
            let input = patient.patient_input()?;
            let explained =
                commands::run_explain(&cfg, catalog, input, patient.model.as_deref(), chart.as_deref()).await?;
            if !explained {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Health => {
            if commands::run_health(&cfg).await {
                println!("ok: {}", cfg.base_url);
            } else {
                println!("unreachable: {}", cfg.base_url);
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Config(ConfigCommand::Show) => {
            println!("{}", serde_json::to_string_pretty(&config::config_info(&cfg))?);
        }
        Command::Config(ConfigCommand::Init { base_url, api_key }) => {
            let mut fresh = KalacalConfig::default();
            if let Some(url) = base_url {
                fresh.base_url = url;
            }
            fresh.api_key = api_key;
            let path = match cli.config.as_deref().and_then(Path::parent) {
                Some(dir) if !dir.as_os_str().is_empty() => config::save_config_to(dir, &fresh)?,
                _ => config::save_config(&fresh)?,
            };
            println!("wrote {}", path.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
