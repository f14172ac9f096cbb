//! One-shot query command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, Outcome};
use anyhow::Result;
use console::style;

/// Run a single query and print the answer.
pub async fn run_query(message: &str, model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }

    let orchestrator = Orchestrator::new(&settings)?;

    println!("{} {}", style("Query:").green().bold(), message);
    let spinner = Output::spinner("Processing...");

    match orchestrator.process_query(message).await {
        Ok(response) => {
            spinner.finish_and_clear();
            Output::answer(&response);

            if response.outcome != Outcome::Completed {
                Output::warning(&format!(
                    "Query ended early ({:?}) after {} iteration(s)",
                    response.outcome, response.iterations
                ));
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Query failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
