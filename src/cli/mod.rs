//! Command-line surface over [`crate::verifier::Verifier`].

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::entities::prescription::{DrugInput, VerificationRequest};
use crate::error::RxVerifyError;
use crate::render;
use crate::verifier::Verifier;

pub mod health;

#[derive(Parser, Debug)]
#[command(
    name = "rxverify",
    version,
    about = "Medication name resolution, interaction checks, and LLM-backed prescription guidance"
)]
pub struct Cli {
    /// Emit JSON instead of markdown
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a free-text drug name to an RxCUI
    Resolve {
        /// Drug name, misspellings allowed
        name: String,
    },

    /// List pairwise interactions among drugs
    Interactions {
        /// Drug names (at least two must resolve for a lookup)
        #[arg(required = true, num_args = 1..)]
        drugs: Vec<String>,
    },

    /// Ask whether a dosage is appropriate for a patient's age
    Dosage {
        /// Patient age in years
        #[arg(long)]
        age: u32,
        drug: String,
        dosage: String,
    },

    /// Suggest a safer alternative for a drug with a known interaction
    Alternative {
        /// Drug to replace
        problem_drug: String,
        /// Drug it interacts with
        interacting_drug: String,
    },

    /// Extract drug names and dosages from free text
    Extract {
        /// Prescription note; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Verify a prescription: interactions, dosage analysis, alternatives
    Verify {
        /// Patient age in years
        #[arg(long)]
        age: u32,
        /// Drugs as NAME or NAME=DOSAGE (e.g. warfarin=5mg)
        #[arg(required = true, num_args = 1.., value_parser = parse_drug_input)]
        drugs: Vec<DrugInput>,
    },

    /// Check connectivity to RxNav and the configured providers
    Health,
}

fn parse_drug_input(raw: &str) -> Result<DrugInput, String> {
    let (name, dosage) = match raw.split_once('=') {
        Some((name, dosage)) => (name.trim(), Some(dosage.trim())),
        None => (raw.trim(), None),
    };
    if name.is_empty() {
        return Err(format!("missing drug name in {raw:?}"));
    }
    Ok(DrugInput {
        name: name.to_string(),
        dosage: dosage.filter(|d| !d.is_empty()).map(str::to_string),
    })
}

/// Runs the parsed command against endpoints and credentials from the environment.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    run_with_config(cli, &Config::from_env()).await
}

pub(crate) async fn run_with_config(cli: Cli, config: &Config) -> anyhow::Result<String> {
    let json = cli.json;
    let verifier = Verifier::from_config(config)?;

    match cli.command {
        Commands::Resolve { name } => {
            let drug = verifier.resolve(&name).await;
            if json {
                Ok(render::json::to_pretty(&drug)?)
            } else {
                Ok(render::markdown::resolve_markdown(&name, &drug)?)
            }
        }
        Commands::Interactions { drugs } => {
            let interactions = verifier.check_interactions(&drugs).await;
            if json {
                Ok(render::json::to_pretty(&interactions)?)
            } else {
                Ok(render::markdown::interactions_markdown(&drugs, &interactions)?)
            }
        }
        Commands::Dosage { age, drug, dosage } => {
            let text = verifier.dosage_guidance(age, &drug, &dosage).await;
            if json {
                Ok(render::json::to_pretty(&serde_json::json!({ "analysis": text }))?)
            } else {
                Ok(render::markdown::guidance_markdown(
                    &format!("Dosage: {drug} {dosage} (age {age})"),
                    &text,
                ))
            }
        }
        Commands::Alternative {
            problem_drug,
            interacting_drug,
        } => {
            let text = verifier
                .suggest_alternative(&problem_drug, &interacting_drug)
                .await;
            if json {
                Ok(render::json::to_pretty(&serde_json::json!({ "suggestion": text }))?)
            } else {
                Ok(render::markdown::guidance_markdown(
                    &format!("Alternative to {problem_drug} (with {interacting_drug})"),
                    &text,
                ))
            }
        }
        Commands::Extract { text } => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                return Err(RxVerifyError::InvalidArgument(
                    "Prescription text cannot be empty".into(),
                )
                .into());
            }
            let records = verifier.extract_from_text(&text).await;
            if json {
                Ok(render::json::to_pretty(&records)?)
            } else {
                Ok(render::markdown::extraction_markdown(&records)?)
            }
        }
        Commands::Verify { age, drugs } => {
            let report = verifier
                .verify_prescription(&VerificationRequest { age, drugs })
                .await;
            if json {
                Ok(render::json::to_pretty(&report)?)
            } else {
                Ok(render::markdown::verification_markdown(&report)?)
            }
        }
        Commands::Health => {
            let report = health::check(config).await?;
            if json {
                Ok(render::json::to_pretty(&report)?)
            } else {
                Ok(report.to_markdown())
            }
        }
    }
}
