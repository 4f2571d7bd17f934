//! `sidecars catalog`

use anyhow::Result;
use crossterm::style::Stylize;
use sidecar_core::ProvisionConfig;
use sidecar_schema::AssetEntry;

use crate::ui::NAME_WIDTH;

/// List each sidecar, whether it is required, and its asset per target.
pub fn catalog(config: &ProvisionConfig) -> Result<()> {
    let source = match &config.config_path {
        Some(path) => path.display().to_string(),
        None => "built-in".to_string(),
    };
    println!();
    println!(
        "  {} {} ({source})",
        "catalog".bold(),
        config.source.repo().as_str()
    );

    for spec in config.catalog.sidecars() {
        let kind = if spec.required() {
            "required".green()
        } else {
            "optional".dark_grey()
        };
        println!();
        println!(
            "  {} {kind}",
            format!("{:<NAME_WIDTH$}", spec.name().as_str()).bold()
        );

        for (target, entry) in spec.assets() {
            let detail = match entry {
                AssetEntry::Raw { file } => file.clone(),
                AssetEntry::Archive {
                    file,
                    format,
                    members,
                } => {
                    let members = members
                        .iter()
                        .map(|(member, dest)| format!("{member} -> {dest}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{file} [{format}: {members}]")
                }
            };
            println!("    {:<28} {detail}", target.as_str());
        }
    }
    Ok(())
}
