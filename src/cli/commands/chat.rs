//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

const EXAMPLES: &[(&str, &[&str])] = &[
    (
        "Geocoding",
        &[
            "What are the coordinates of New York City?",
            "What address is at latitude 40.7128, longitude -74.0060?",
            "Find restaurants near Times Square",
        ],
    ),
    (
        "Routing",
        &[
            "What's the driving route from Boston to New York?",
            "How long does it take to bike from Central Park to the Statue of Liberty?",
            "Calculate distances from Manhattan to Brooklyn, Queens, and the Bronx",
        ],
    ),
    (
        "Tiles",
        &[
            "What tile providers are available?",
            "Tell me about the OpenStreetMap tile provider",
            "What's the attribution for the CARTO Positron tiles?",
        ],
    ),
    (
        "Combined",
        &[
            "Get coordinates for NYC, then find a route to Boston",
            "Geocode Central Park and find nearby museums",
        ],
    ),
];

/// Run the interactive chat command.
///
/// Every line is answered as its own query; the orchestrator is shared for
/// the session but no transcript carries over between questions.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }

    let orchestrator = Orchestrator::new(&settings)?;

    println!("\n{}", style("Kart Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about places, routes or map tiles. Type 'exit' or 'quit' to leave, '?' for help.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            println!();
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if is_exit(input) {
            Output::info("Goodbye!");
            break;
        }

        if input == "?" {
            show_help();
            continue;
        }

        let spinner = Output::spinner("Processing...");
        let result = orchestrator.process_query(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => Output::answer(&response),
            Err(e) => Output::error(&format!("Error: {}", e)),
        }
    }

    Ok(())
}

fn is_exit(input: &str) -> bool {
    ["exit", "quit", "bye"]
        .iter()
        .any(|word| input.eq_ignore_ascii_case(word))
}

fn show_help() {
    Output::header("Commands");
    Output::list_item("exit / quit / bye - leave the chat");
    Output::list_item("? - show this help");

    for (section, queries) in EXAMPLES {
        Output::header(&format!("Example queries: {}", section));
        for query in *queries {
            Output::list_item(query);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(is_exit("Bye"));
        assert!(!is_exit("goodbye"));
    }
}
