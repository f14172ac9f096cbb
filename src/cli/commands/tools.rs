//! Tools command: list providers and their catalogs.

use crate::cli::Output;
use crate::config::Settings;
use crate::providers::default_providers;
use crate::tools::ToolRegistry;
use anyhow::Result;
use console::style;

/// Print every provider with the tools it registers.
pub fn run_tools(settings: Settings) -> Result<()> {
    let registry = ToolRegistry::new(default_providers(&settings)?)?;

    for provider in registry.providers() {
        let info = provider.info();
        Output::header(&info.name);
        println!("  {}", style(&info.description).dim());
        if let Some(base_url) = &info.base_url {
            Output::kv("Endpoint", base_url);
        }
        if !info.resources.is_empty() {
            Output::kv("Resources", &info.resources.join(", "));
        }

        for spec in provider.catalog() {
            Output::list_item(&format!("{} - {}", style(&spec.name).bold(), spec.description));
        }
    }

    println!();
    Output::info(&format!("{} tools available", registry.catalog().len()));
    Ok(())
}
