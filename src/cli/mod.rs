//! CLI module for the résumé ATS scorer
//!
//! Subcommands:
//! - `serve`: HTTP API server
//! - `analyze`: score one résumé file and print the report as JSON
//! - `models`: list the model catalog

pub mod analyze;
pub mod models;
pub mod serve;

use clap::{Parser, Subcommand};

/// Résumé ATS scorer - applicant tracking system compatibility reports
#[derive(Parser)]
#[command(name = "resume-ats-scorer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Analyze a résumé file
    Analyze(analyze::AnalyzeArgs),

    /// List the models available for AI analysis
    Models(models::ModelsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_args() {
        let cli = Cli::try_parse_from([
            "resume-ats-scorer",
            "analyze",
            "--file",
            "resume.txt",
            "--industry",
            "finance",
            "--no-ai",
        ])
        .unwrap();

        match cli.command {
            Command::Analyze(args) => {
                assert_eq!(args.file.to_str(), Some("resume.txt"));
                assert_eq!(args.industry.as_deref(), Some("finance"));
                assert!(args.no_ai);
                assert!(!args.pretty);
            }
            _ => panic!("expected analyze command"),
        }
    }

    #[test]
    fn test_analyze_requires_file() {
        assert!(Cli::try_parse_from(["resume-ats-scorer", "analyze"]).is_err());
    }
}
