//! Analyze command - scores one résumé file and prints the report

use std::path::PathBuf;

use clap::Args;

use crate::config::AppConfig;
use crate::infrastructure::analysis::{AnalyzeRequest, AtsAnalysisServiceTrait};
use crate::infrastructure::logging::init_logging;

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Plain-text résumé file
    #[arg(long, short)]
    pub file: PathBuf,

    /// Target industry for keyword scoring
    #[arg(long, short)]
    pub industry: Option<String>,

    /// Session charged for AI usage
    #[arg(long)]
    pub session: Option<String>,

    /// Model for AI analysis
    #[arg(long)]
    pub model: Option<String>,

    /// Rule-based analysis only
    #[arg(long)]
    pub no_ai: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,
}

impl AnalyzeArgs {
    fn into_request(self, resume_text: String) -> AnalyzeRequest {
        AnalyzeRequest {
            resume_text,
            target_industry: self.industry,
            session_id: self.session,
            model: self.model,
            use_ai: !self.no_ai,
        }
    }
}

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging);

    let resume_text = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.file.display(), e))?;

    let pretty = args.pretty;
    let services = crate::create_services(&config).await?;
    let response = services
        .analysis
        .analyze(args.into_request(resume_text))
        .await?;

    let output = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", output);

    Ok(())
}
