//! Résumé ATS scorer
//!
//! Scores résumé text for applicant-tracking-system compatibility:
//! - Deterministic rule-based analysis in four weighted sections
//! - Optional AI-augmented analysis with rule-based fallback
//! - Per-session daily token and monthly budget quotas
//! - Model catalog with cost-aware model selection

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use config::StorageBackend;
use domain::catalog::{ModelCatalog, StaticModelCatalog};
use domain::usage::{QuotaLedger, UsageRepository};
use domain::RuleBasedAnalyzer;
use infrastructure::analysis::{
    executor_for, AiAnalyzerConfig, AiAugmentedAnalyzer, AtsAnalysisService,
};
use infrastructure::llm::LlmProviderFactory;
use infrastructure::usage::{
    ensure_usage_schema, InMemoryQuotaLedger, InMemoryUsageRepository, PostgresQuotaLedger,
    PostgresUsageRepository, QuotaManager, QuotaManagerTrait,
};
use tracing::{info, warn};

/// Wired services shared by the HTTP server and the CLI
#[derive(Debug, Clone)]
pub struct Services {
    pub analysis: Arc<AtsAnalysisService>,
    pub quota: Arc<dyn QuotaManagerTrait>,
    pub catalog: Arc<dyn ModelCatalog>,
}

/// Create the application state with all services initialized
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let services = create_services(config).await?;

    Ok(AppState::new(services.analysis, services.quota, services.catalog))
}

/// Build every service from configuration
pub async fn create_services(config: &AppConfig) -> anyhow::Result<Services> {
    config.validate()?;

    let catalog: Arc<dyn ModelCatalog> =
        Arc::new(StaticModelCatalog::for_provider(config.ai.provider.as_str())?);
    let rule_based = RuleBasedAnalyzer::new(config.analysis.clone())?;

    let (ledger, repository) = create_usage_stores(config).await?;
    let quota: Arc<dyn QuotaManagerTrait> = Arc::new(QuotaManager::new(
        ledger,
        repository,
        catalog.clone(),
        config.quota.limits(),
    ));

    let ai_config = AiAnalyzerConfig::from_config(&config.ai, &config.quota);
    let mut analysis = AtsAnalysisService::new(rule_based.clone(), quota.clone())
        .with_executor(executor_for(ai_config.timeout))
        .with_anonymous_session_id(config.quota.anonymous_session_id.clone());

    if config.ai.enabled {
        match LlmProviderFactory::create(&config.ai) {
            Ok(provider) => {
                info!(provider = provider.provider_name(), "AI analysis enabled");
                let ai = AiAugmentedAnalyzer::new(provider, catalog.clone(), rule_based, ai_config)
                    .with_quota_manager(quota.clone());
                analysis = analysis.with_ai_analyzer(Arc::new(ai));
            }
            Err(e) => warn!(error = %e, "AI provider unavailable, serving rule-based analysis only"),
        }
    } else {
        info!("AI analysis disabled by configuration");
    }

    Ok(Services {
        analysis: Arc::new(analysis),
        quota,
        catalog,
    })
}

async fn create_usage_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn QuotaLedger>, Arc<dyn UsageRepository>)> {
    info!("Storage backend: {:?}", config.storage.backend);

    match config.storage.backend {
        StorageBackend::Memory => Ok((
            Arc::new(InMemoryQuotaLedger::new()),
            Arc::new(InMemoryUsageRepository::new(config.storage.max_usage_records)),
        )),
        StorageBackend::Postgres => {
            let database_url = std::env::var(&config.storage.database_url_env).map_err(|_| {
                anyhow::anyhow!(
                    "{} environment variable is required for the postgres backend",
                    config.storage.database_url_env
                )
            })?;

            info!("Connecting to PostgreSQL...");
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to PostgreSQL: {}", e))?;
            ensure_usage_schema(&pool).await?;
            info!("PostgreSQL connection established");

            Ok((
                Arc::new(PostgresQuotaLedger::new(pool.clone())),
                Arc::new(PostgresUsageRepository::new(pool)),
            ))
        }
    }
}
