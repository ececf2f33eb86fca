use anyhow::Context;
use feed_client::MoltbookClient;
use llm_interface::ClaudeProvider;
use memory_store::{JsonFileStore, MemoryStore};
use moltscout_core::{AppConfig, CoreError, ErrorReporter};
use opportunity_engine::{CategorizedOpportunities, Category, OpportunityEngine};
use scan_service::{load_context_document, ScanOrchestrator, ScanOutcome};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type Orchestrator = ScanOrchestrator<MoltbookClient, ClaudeProvider, JsonFileStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("moltscout=info,scan_service=info,feed_client=info,opportunity_engine=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting moltscout");

    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    let engine = OpportunityEngine::from_config(&config).context("building the scoring engine")?;
    let context_document = load_context_document(config.analysis.context_path.as_deref())
        .await
        .context("reading the analysis context document")?;

    let orchestrator = ScanOrchestrator::new(
        MoltbookClient::new(&config.api).context("creating the feed client")?,
        ClaudeProvider::new(&config.llm).context("creating the analysis provider")?,
        JsonFileStore::new(&config.memory.path),
        &config,
    )
    .with_context_document(context_document);

    let mut memory = orchestrator
        .load_memory()
        .await
        .context("loading the seen-posts memory")?;

    match config.polling_interval_minutes {
        Some(minutes) => poll(&orchestrator, &engine, &mut memory, minutes).await,
        None => {
            scan_once(&orchestrator, &engine, &mut memory).await?;
            Ok(())
        }
    }
}

async fn poll(
    orchestrator: &Orchestrator,
    engine: &OpportunityEngine,
    memory: &mut MemoryStore,
    minutes: u64,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(minutes.max(1) * 60));
    tracing::info!("Polling every {} minutes, Ctrl-C to stop", minutes.max(1));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // a failed scan is retried on the next tick with the same posts
                if let Err(e) = scan_once(orchestrator, engine, memory).await {
                    tracing::warn!("Scan failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                return Ok(());
            }
        }
    }
}

async fn scan_once(
    orchestrator: &Orchestrator,
    engine: &OpportunityEngine,
    memory: &mut MemoryStore,
) -> Result<(), CoreError> {
    match orchestrator.run(memory).await {
        Ok(Some(outcome)) => {
            report(engine, &outcome);
            Ok(())
        }
        Ok(None) => {
            tracing::info!("Nothing new since the last check");
            Ok(())
        }
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            tracing::error!("Scan aborted, nothing was marked seen");
            Err(e)
        }
    }
}

fn report(engine: &OpportunityEngine, outcome: &ScanOutcome) {
    let categorized = engine.score_and_categorize(&outcome.new_posts);
    log_buckets(&categorized);

    let suggestion = engine.suggest_post(&categorized.scored);
    tracing::info!(
        "Suggested post for m/{}: \"{}\" ({})",
        suggestion.channel,
        suggestion.title,
        suggestion.reason
    );

    if outcome.analysis.is_empty() {
        tracing::info!("Analysis returned no text");
    } else {
        tracing::info!("Analysis:\n{}", outcome.analysis);
    }
}

fn log_buckets(categorized: &CategorizedOpportunities) {
    for category in Category::ALL {
        let bucket = categorized.bucket(category);
        if bucket.is_empty() {
            continue;
        }
        tracing::info!("{} ({}):", category, bucket.len());
        for opportunity in bucket {
            tracing::info!("  {}", opportunity);
        }
    }
}
