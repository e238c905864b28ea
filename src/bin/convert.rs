//! AzureMachine Conversion CLI
//!
//! Converts AzureMachine objects between API versions and audits the field
//! mappers of every spoke version.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use azmachine_conversion::api::{v1alpha3, v1alpha4, v1beta1, AnyAzureMachine, AnyAzureMachineList, KIND, LIST_KIND};
use azmachine_conversion::config::OutputFormat;
use azmachine_conversion::{ApiVersion, ConversionConfig, Degradation, FidelityAuditor, FidelityReport, Spoke};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "azmachine-convert")]
#[command(about = "Convert AzureMachine objects between API versions")]
struct Cli {
    /// Configuration file (defaults to conversion.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an AzureMachine or AzureMachineList to another version
    Convert {
        /// JSON file to convert
        file: PathBuf,
        /// Target version (e.g. "v1alpha4")
        #[arg(short, long)]
        to: String,
        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Check that every lossy field of each older version is preserved
    Audit {
        /// Hub (v1beta1) AzureMachine with every field populated
        file: PathBuf,
        /// Print the mapper-only round trip diff for each version
        #[arg(long)]
        diff: bool,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "conversion.toml")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConversionConfig::load_from(cli.config.as_deref().and_then(Path::to_str))
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Convert { file, to, compact } => {
            let target = ApiVersion::parse(&to)?;
            let format = if compact { OutputFormat::Compact } else { config.output.format };
            let input = read_json(&file)?;
            let converter = config.converter();

            let (mut output, kind) = if is_list(&input) {
                let list: AnyAzureMachineList =
                    serde_json::from_value(input).context("input is not an AzureMachineList")?;
                eprintln!("🔄 Converting {} items: {} -> {}", list.len(), list.version(), target);
                let converted = list.convert_to(target, &converter)?;
                for (index, degradation) in &converted.degraded {
                    report_degradation(Some(*index), degradation);
                }
                (serde_json::to_value(converted.list)?, LIST_KIND)
            } else {
                let machine: AnyAzureMachine =
                    serde_json::from_value(input).context("input is not an AzureMachine")?;
                eprintln!("🔄 Converting: {} -> {}", machine.version(), target);
                let converted = machine.convert_to(target, &converter)?;
                if let Some(degradation) = &converted.degraded {
                    report_degradation(None, degradation);
                }
                (serde_json::to_value(converted.object)?, KIND)
            };

            if let Value::Object(map) = &mut output {
                map.insert("kind".to_string(), Value::String(kind.to_string()));
            }
            println!("{}", format.render(&output)?);
            Ok(())
        }

        Commands::Audit { file, diff } => {
            let sample: v1beta1::AzureMachine =
                serde_json::from_value(read_json(&file)?).context("input is not a v1beta1 AzureMachine")?;
            let auditor = FidelityAuditor::new();

            println!("🔍 Auditing field mappers against {}", file.display());
            println!();

            let mut complete = true;
            for version in ApiVersion::spokes() {
                let (report, text) = match version {
                    ApiVersion::V1Alpha3 => audit::<v1alpha3::AzureMachine>(&auditor, &sample, diff)?,
                    ApiVersion::V1Alpha4 => audit::<v1alpha4::AzureMachine>(&auditor, &sample, diff)?,
                    ApiVersion::V1Beta1 => continue,
                };

                if report.is_complete() {
                    println!("✅ {} - {}", version, report.summary);
                } else {
                    complete = false;
                    println!("❌ {} - {}", version, report.summary);
                    for change in report.uncovered() {
                        println!("   └─ {:?} at {}", change.change_type, change.path);
                    }
                }
                if let Some(text) = text {
                    print!("{}", text);
                }
            }

            println!();
            if !complete {
                println!("❌ Some lossy fields are not preserved");
                std::process::exit(1);
            }
            println!("✅ All older versions round-trip losslessly");
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init { output } => {
                if output.exists() {
                    bail!("{} already exists", output.display());
                }
                let path = output.to_str().context("config path is not valid UTF-8")?;
                ConversionConfig::default().save(path)?;
                println!("✅ Wrote {}", output.display());
                Ok(())
            }
        },
    }
}

fn audit<S: Spoke<Hub = v1beta1::AzureMachine>>(
    auditor: &FidelityAuditor,
    sample: &v1beta1::AzureMachine,
    diff: bool,
) -> anyhow::Result<(FidelityReport, Option<String>)> {
    let report = auditor.audit::<S>(sample)?;
    let text = if diff { Some(auditor.text_diff::<S>(sample)?) } else { None };
    Ok((report, text))
}

fn report_degradation(index: Option<usize>, degradation: &Degradation) {
    let item = index.map(|i| format!("item {}: ", i)).unwrap_or_default();
    match degradation {
        Degradation::Decode(e) => eprintln!("⚠️  {}Preserved data ignored: {}", item, e),
        Degradation::Encode(e) => eprintln!("⚠️  {}Result is not round-trippable: {}", item, e),
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn is_list(value: &Value) -> bool {
    let kind_is_list = value
        .get("kind")
        .and_then(Value::as_str)
        .is_some_and(|k| k.ends_with("List"));
    kind_is_list || value.get("items").is_some()
}
