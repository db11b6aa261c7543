//! Distro catalog listing

use anyhow::Result;
use colored::Colorize;
use instrumentor_lib::OtelDistro;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::load_catalog;
use crate::output::{print_json, print_warning, OutputFormat};

#[derive(Tabled)]
struct DistroRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Language")]
    language: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Parameters")]
    parameters: String,
    #[tabled(rename = "Head Sampling")]
    head_sampling: String,
    #[tabled(rename = "LD_PRELOAD")]
    ld_preload: String,
}

#[derive(Serialize)]
struct DistroSummary<'a> {
    #[serde(flatten)]
    distro: &'a OtelDistro,
    default: bool,
}

fn yes_no(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".to_string()
    }
}

/// List every distro of the catalog and the per-language defaults
pub fn list(catalog_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let defaults = catalog.default_distro_names();
    let is_default =
        |distro: &OtelDistro| defaults.get(&distro.language) == Some(&distro.name);

    match format {
        OutputFormat::Json => {
            let summaries: Vec<DistroSummary<'_>> = catalog
                .distros()
                .map(|distro| DistroSummary {
                    distro,
                    default: is_default(distro),
                })
                .collect();
            print_json(&summaries)
        }
        OutputFormat::Table => {
            if catalog.is_empty() {
                print_warning("Catalog has no distros");
                return Ok(());
            }

            let rows: Vec<DistroRow> = catalog
                .distros()
                .map(|d| DistroRow {
                    name: d.name.clone(),
                    language: d.language.to_string(),
                    default: yes_no(is_default(d)),
                    parameters: if d.require_parameters.is_empty() {
                        "-".to_string()
                    } else {
                        d.require_parameters.join(",")
                    },
                    head_sampling: yes_no(d.supports_head_sampling()),
                    ld_preload: yes_no(d.ld_preload_supported()),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} distros", catalog.len());
            Ok(())
        }
    }
}
