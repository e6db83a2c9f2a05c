//! Models command - prints the model catalog as JSON

use clap::Args;

use crate::domain::catalog::{ModelCatalog, StaticModelCatalog};

#[derive(Debug, Args)]
pub struct ModelsArgs {
    /// Only models of this provider (openai, anthropic)
    #[arg(long)]
    pub provider: Option<String>,
}

pub fn run(args: ModelsArgs) -> anyhow::Result<()> {
    let catalog = match args.provider {
        Some(ref provider) => StaticModelCatalog::for_provider(provider)?,
        None => StaticModelCatalog::default(),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&catalog.get_available_models())?
    );

    Ok(())
}
