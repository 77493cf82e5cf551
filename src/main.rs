use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use secrecy::SecretString;

use bchat_core::config::Config;
use bchat_core::Provider;
use bchat_engine::ChatProcessor;
use bchat_llm::{
    AnthropicProvider, CompletionOptions, GeminiProvider, ReliableClient, ResilienceConfig,
    SummaryProvider,
};
use bchat_store::PathManager;
use bchat_telemetry::{init_telemetry, TelemetryConfig};

/// Context-aware chat logging and retrieval.
#[derive(Debug, Parser)]
#[command(name = "bchat", version)]
struct Cli {
    /// Prompt to process.
    prompt: Option<String>,

    /// Provider override (claude or gemini). Defaults to the configured one.
    #[arg(long)]
    provider: Option<Provider>,

    /// Config file. Defaults to config/config.json under the project root.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Consolidate pending raw logs instead of processing a prompt.
    #[arg(long)]
    consolidate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    // Two-phase setup: discover the root with default paths, load the config
    // that lives there, then re-resolve paths with the configured layout.
    let bootstrap = PathManager::discover(&cwd, Default::default());
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| bootstrap.project_root().join("config").join("config.json"));
    let config = Config::load(&config_path);

    let paths = PathManager::new(bootstrap.project_root().to_path_buf(), config.paths.clone());
    paths
        .ensure_directories()
        .context("cannot create chat directories")?;

    let _telemetry = init_telemetry(TelemetryConfig {
        log_level: config.system.log_level.clone(),
        log_file: Some(paths.logs_dir().join("bchat.log")),
    });
    tracing::info!(root = %paths.project_root().display(), "bchat starting");

    let provider = cli.provider.unwrap_or(config.api.provider);
    let options = CompletionOptions {
        max_tokens: config.api.max_tokens,
        temperature: config.api.temperature,
    };
    let resilience = ResilienceConfig::from_config(&config.api, &config.error_handling);

    match provider {
        Provider::Claude => {
            let key = api_key("ANTHROPIC_API_KEY", provider)?;
            let inner = AnthropicProvider::new(key, config.api.model.clone(), options);
            run(&cli, paths, ReliableClient::new(inner, resilience), provider).await
        }
        Provider::Gemini => {
            let key = api_key("GOOGLE_API_KEY", provider)?;
            let inner = GeminiProvider::new(key, config.api.model.clone(), options);
            run(&cli, paths, ReliableClient::new(inner, resilience), provider).await
        }
    }
}

fn api_key(var: &str, provider: Provider) -> Result<SecretString> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(SecretString::from(key)),
        _ => bail!("{var} environment variable is required for {provider}"),
    }
}

async fn run<P: SummaryProvider>(
    cli: &Cli,
    paths: PathManager,
    client: ReliableClient<P>,
    provider: Provider,
) -> Result<()> {
    let processor = ChatProcessor::new(paths, client);

    if cli.consolidate {
        let report = processor.consolidate().await?;
        println!("✅ bchat consolidation complete");
        println!("   Raw files processed: {}", report.raw_files_processed);
        println!("   Chat history indexed and ready for context queries");
        return Ok(());
    }

    let Some(prompt) = cli.prompt.as_deref() else {
        bail!("a prompt is required unless --consolidate is given");
    };

    let outcome = processor.process_prompt(prompt, provider).await?;
    let context_status = if outcome.context_injected {
        "✓ Context injected"
    } else {
        "○ No context needed"
    };
    println!("✅ bchat processed successfully");
    println!("   Provider: {provider}");
    println!("   Context: {context_status}");
    if outcome.summary.is_degraded() {
        println!("   Status: Logged to chat history");
    } else {
        println!("   Summary: {}", outcome.summary.summary);
    }
    Ok(())
}
