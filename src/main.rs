use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use youtext::cli::{Cli, Commands, ModelArgs, VideoArgs};
use youtext::config::Config;
use youtext::output::{self, OutputWriter};
use youtext::summarize::{OpenAiClient, Summarizer};
use youtext::transcript::YoutubeTranscriptSource;
use youtext::{Pipeline, YoutextError};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "youtext=debug"
    } else if cli.quiet {
        "youtext=warn"
    } else {
        "youtext=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run(cli).await {
        let code = err
            .downcast_ref::<YoutextError>()
            .map(YoutextError::exit_code)
            .unwrap_or(1);

        tracing::debug!("Command failed: {:?}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Config { show: false } = cli.command {
        return write_default_config(cli.config.as_deref());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.output_dir {
        config.app.output_dir = Some(dir.clone());
    }

    let report = match cli.command {
        Commands::Script { video } => {
            pipeline(&mut config, &video, None, cli.quiet)?
                .script(&video.input)
                .await?
        }
        Commands::Summ { video, model, policy } => {
            if let Some(policy) = policy {
                config.summary.context_policy = policy;
            }
            pipeline(&mut config, &video, Some(&model), cli.quiet)?
                .summ(&video.input)
                .await?
        }
        Commands::Outline { video, model } => {
            pipeline(&mut config, &video, Some(&model), cli.quiet)?
                .outline(&video.input)
                .await?
        }
        Commands::Config { .. } => {
            config.display();
            return Ok(());
        }
    };

    output::print_report(&report, &cli.format, cli.quiet)
}

fn write_default_config(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::user_config_path()?,
    };

    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }

    Config::default().save(&path)?;
    println!("Default configuration written to: {}", path.display());
    Ok(())
}

/// Assemble the pipeline for a video command; no summarizer is built without an API key
fn pipeline(
    config: &mut Config,
    video: &VideoArgs,
    model: Option<&ModelArgs>,
    quiet: bool,
) -> Result<Pipeline> {
    if !video.languages.is_empty() {
        config.transcript.languages = video.languages.clone();
    }

    if let Some(name) = model.and_then(|m| m.model.as_ref()) {
        config.openai.model = name.clone();
    }

    config.validate()?;

    let output_dir = config.output_dir();
    if !output_dir.is_dir() {
        return Err(YoutextError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Output directory does not exist: {}", output_dir.display()),
        ))
        .into());
    }

    let api_key = model
        .and_then(|m| m.api_key.as_deref())
        .filter(|key| !key.trim().is_empty());

    let summarizer = match api_key {
        Some(api_key) => {
            let client = OpenAiClient::new(&config.openai, api_key)?;
            let summarizer = Summarizer::from_config(config, Box::new(client))?;
            tracing::debug!(
                "Using {} with {} context policy",
                config.openai.model,
                config.summary.context_policy
            );
            Some(summarizer)
        }
        None => None,
    };

    let source = YoutubeTranscriptSource::new(&config.transcript)
        .context("Failed to set up transcript retrieval")?;

    Ok(Pipeline::new(
        Box::new(source),
        summarizer,
        OutputWriter::new(output_dir),
        quiet,
    ))
}
