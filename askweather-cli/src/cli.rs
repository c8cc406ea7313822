use anyhow::{Context, bail};
use askweather_core::{Config, InvokeInput, InvokeOutput, Pipeline, Service, WeatherRecord};
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use tracing::{debug, info};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "askweather", version, about = "Ask for the weather in plain language")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API keys and settings interactively.
    Configure,

    /// Show current weather for the city mentioned in a sentence.
    Ask {
        /// Free-form text mentioning a city, in any language.
        text: Option<String>,

        /// Query this city directly and skip extraction.
        #[arg(long)]
        city: Option<String>,

        /// Print the tagged JSON result instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Print the location of the configuration file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Ask { text, city, json } => ask(text, city, json).await,
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    for service in [Service::Weather, Service::LanguageModel] {
        let prompt = format!("{} key (leave empty to use ${}):", service, service.env_var());
        let key = Password::new(&prompt)
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?;
        cfg.set_api_key(service, &key);
    }

    let language = Text::new("Weather description language:")
        .with_default(&cfg.settings.language)
        .prompt()
        .context("Failed to read language")?;
    if !language.trim().is_empty() {
        cfg.settings.language = language.trim().to_string();
    }

    cfg.save()?;
    let path = Config::config_file_path()?;
    info!(path = %path.display(), "configuration saved");
    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn ask(text: Option<String>, city: Option<String>, json: bool) -> anyhow::Result<()> {
    if text.is_none() && city.is_none() {
        bail!("Nothing to ask. Pass a sentence, e.g. `askweather ask \"weather in Tokyo?\"`, or --city <name>.");
    }

    let cfg = Config::load()?;
    debug!(settings = ?cfg.settings, "configuration loaded");
    let pipeline = Pipeline::new(&cfg.settings).context("Invalid settings in configuration file")?;
    let input = InvokeInput { messages: None, query: text, city };

    let output = pipeline.invoke(input, &cfg.call_config()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match output {
        InvokeOutput::Success { weather_info, message, .. } => {
            println!("{message}");
            print_record(&weather_info);
            Ok(())
        }
        InvokeOutput::Error { error } => bail!(error),
    }
}

fn print_record(record: &WeatherRecord) {
    println!();
    println!("  City:        {} ({})", record.city, record.country);
    println!("  Conditions:  {}", record.description);
    println!("  Temperature: {} (feels like {})", record.temperature, record.feels_like);
    println!("  Humidity:    {}", record.humidity);
    println!("  Pressure:    {}", record.pressure);
    println!("  Wind:        {}", record.wind_speed);
    println!("  Visibility:  {}", record.visibility);
    println!("  Retrieved:   {}", Local::now().format("%Y-%m-%d %H:%M"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_accepts_text_and_city() {
        let cli = Cli::try_parse_from(["askweather", "ask", "weather in Tokyo?", "--city", "Osaka"])
            .unwrap();

        match cli.command {
            Command::Ask { text, city, json } => {
                assert_eq!(text.as_deref(), Some("weather in Tokyo?"));
                assert_eq!(city.as_deref(), Some("Osaka"));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn ask_city_only_with_json() {
        let cli = Cli::try_parse_from(["askweather", "ask", "--city", "Seoul", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Ask { text: None, json: true, .. }));
    }

    #[test]
    fn configure_and_config_path_parse() {
        assert!(matches!(
            Cli::try_parse_from(["askweather", "configure"]).unwrap().command,
            Command::Configure
        ));
        assert!(matches!(
            Cli::try_parse_from(["askweather", "config-path"]).unwrap().command,
            Command::ConfigPath
        ));
    }

    #[tokio::test]
    async fn ask_without_input_is_rejected() {
        let err = ask(None, None, false).await.unwrap_err();
        assert!(err.to_string().contains("Nothing to ask"));
    }
}
