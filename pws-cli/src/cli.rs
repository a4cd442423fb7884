use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use pws_core::{
    Config, FieldNaming, ObservationSource, PublishRequest, Settings, build_fields, build_point,
    config::{InfluxDbConfig, WundergroundConfig},
    fetch_observation, field_catalog, publish,
    sink::sink_from_settings,
    source::source_from_settings,
};
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "pws", version, about = "Publish weather station observations to InfluxDB")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store credentials, station, fields and InfluxDB connection interactively.
    Configure,

    /// Fetch the current observation and publish it as a single point.
    Publish(PublishArgs),

    /// List every field name that can be requested.
    Fields,
}

/// Overrides for the stored configuration.
#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Weather Underground API key (16 alphanumeric characters).
    #[arg(long)]
    api_key: Option<String>,

    /// Personal weather station name, e.g. "KCASANFR58".
    #[arg(long)]
    pws_name: Option<String>,

    /// Comma-separated list of fields, as native names or JSON names.
    #[arg(long, value_delimiter = ',')]
    field_list: Vec<String>,

    /// Output key style: "alias" (JSON names) or "native".
    #[arg(long)]
    naming: Option<FieldNaming>,

    /// InfluxDB URL; a path component is used as the database name.
    #[arg(long)]
    influxdb_host: Option<String>,

    #[arg(long)]
    influxdb_name: Option<String>,

    #[arg(long)]
    influxdb_user: Option<String>,

    #[arg(long)]
    influxdb_password: Option<String>,

    /// Dump the API response and the fields, then exit with status 0 without publishing.
    #[arg(long)]
    debug: bool,
}

impl PublishArgs {
    fn overrides(&self) -> Config {
        Config {
            fields: self.field_list.clone(),
            naming: self.naming,
            wunderground: WundergroundConfig {
                api_key: self.api_key.clone(),
                pws_name: self.pws_name.clone(),
            },
            influxdb: InfluxDbConfig {
                host: self.influxdb_host.clone(),
                database: self.influxdb_name.clone(),
                username: self.influxdb_user.clone(),
                password: self.influxdb_password.clone(),
            },
        }
    }
}

impl Cli {
    pub fn debug(&self) -> bool {
        matches!(&self.command, Command::Publish(args) if args.debug)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Publish(args) => run_publish(args).await,
            Command::Fields => {
                print_fields();
                Ok(())
            }
        }
    }
}

async fn run_publish(args: PublishArgs) -> anyhow::Result<()> {
    let config = Config::load()?.merge(args.overrides());
    let settings = config.settings(args.debug)?;

    let source: Arc<dyn ObservationSource> = Arc::from(source_from_settings(&settings)?);
    let request = PublishRequest {
        pws_name: settings.pws_name.clone(),
        fields: settings.fields.clone(),
        naming: settings.naming,
    };

    if args.debug {
        return dry_run(source, &request).await;
    }

    let influxdb = settings
        .influxdb
        .as_ref()
        .ok_or_else(|| anyhow!("InfluxDB database name is required when not in debug mode."))?;
    let sink = sink_from_settings(influxdb)?;

    let point = publish(source, sink.as_ref(), &request).await?;

    println!(
        "Published {} fields from {} observed at {} to {}.",
        point.fields.len(),
        request.pws_name,
        point.time.format("%Y-%m-%d %H:%M:%S UTC"),
        influxdb.database,
    );

    Ok(())
}

async fn dry_run(source: Arc<dyn ObservationSource>, request: &PublishRequest) -> anyhow::Result<()> {
    let conditions = fetch_observation(source).await?;

    let dump = serde_json::to_string_pretty(&conditions.observation)
        .context("Failed to render observation")?;
    eprintln!("Weather Underground observation:\n{dump}\n");

    let fields = build_fields(request, &conditions.observation)?;
    let dump = serde_json::to_string_pretty(&fields).context("Failed to render fields")?;
    eprintln!("InfluxDB fields:\n{dump}\n");

    let point = build_point(request, &conditions.observation)?;
    eprintln!("Line protocol:\n{point}\n");

    info!("debug mode, not publishing to InfluxDB");
    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let pws_name = Text::new("Personal weather station name:")
        .with_initial_value(config.wunderground.pws_name.as_deref().unwrap_or_default())
        .prompt()?;

    let api_key = Password::new("Weather Underground API key (empty keeps the current one):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;

    let fields = Text::new("Fields to publish (comma-separated):")
        .with_initial_value(&config.fields.join(","))
        .with_help_message("run `pws fields` to list the available names")
        .prompt()?;

    let naming = Select::new("Output field names:", vec![FieldNaming::Alias, FieldNaming::Native])
        .prompt()?;

    let host = Text::new("InfluxDB host:")
        .with_initial_value(
            config.influxdb.host.as_deref().unwrap_or(pws_core::config::DEFAULT_INFLUXDB_HOST),
        )
        .prompt()?;

    let database = Text::new("InfluxDB database:")
        .with_initial_value(config.influxdb.database.as_deref().unwrap_or_default())
        .prompt()?;

    let username = Text::new("InfluxDB username (optional):")
        .with_initial_value(config.influxdb.username.as_deref().unwrap_or_default())
        .prompt()?;

    let password = Password::new("InfluxDB password (empty keeps the current one):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;

    config = config.merge(Config {
        fields: fields.split(',').map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect(),
        naming: Some(naming),
        wunderground: WundergroundConfig {
            api_key: non_empty(api_key),
            pws_name: non_empty(pws_name),
        },
        influxdb: InfluxDbConfig {
            host: non_empty(host),
            database: non_empty(database),
            username: non_empty(username),
            password: non_empty(password),
        },
    });

    // Dry-run validation: the database may still be missing at this point.
    let settings: Settings = config.settings(true)?;
    config.save()?;

    println!(
        "Configuration saved to {} for station {}.",
        Config::config_file_path()?.display(),
        settings.pws_name
    );

    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn print_fields() {
    println!("GROUP                  NATIVE NAME                JSON NAME");
    for entry in field_catalog() {
        println!("{:<22} {:<26} {}", entry.section, entry.name, entry.alias);
    }
}
