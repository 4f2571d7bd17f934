//! `sidecars fetch`

use anyhow::{Context, Result};
use crossterm::style::{Color, Stylize};
use sidecar_core::io::download::HttpFetcher;
use sidecar_core::{
    ProvisionConfig, ProvisionError, ProvisionReport, Provisioner, Reporter, SidecarOutcome,
    SkipReason, TargetResolver,
};

use super::{display_path, skipped_message};
use crate::TargetArgs;
use crate::ui::{ConsoleReporter, NAME_WIDTH};

/// Provision every sidecar and print a summary (or the JSON report).
pub async fn fetch(config: ProvisionConfig, args: &TargetArgs, quiet: bool) -> Result<()> {
    let project_dir = config.project_dir.clone();
    let fetcher = HttpFetcher::new(config.timeout).context("Failed to build HTTP client")?;
    let reporter = std::sync::Arc::new(ConsoleReporter::new(quiet || args.json));
    let provisioner = Provisioner::new(config, TargetResolver::for_host(), fetcher, reporter.clone());

    let report = match provisioner.run(args.target.as_ref()).await {
        Ok(report) => report,
        Err(ProvisionError::MissingOrEmptyVersionTag(err)) => {
            reporter.warning(&skipped_message(&err));
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, &project_dir);
    }
    Ok(())
}

fn print_summary(report: &ProvisionReport, base: &std::path::Path) {
    let target = report
        .target
        .as_ref()
        .map_or_else(|| "unresolved".to_string(), ToString::to_string);
    println!();
    println!("  {} {} ({target})", "sidecars".bold(), report.version);

    for sidecar in &report.sidecars {
        let (status, color, detail) = match &sidecar.outcome {
            SidecarOutcome::AlreadyPresent { path } => {
                ("cached", Color::DarkGrey, display_path(path, base))
            }
            SidecarOutcome::Provisioned { paths } => (
                "fetched",
                Color::Green,
                paths
                    .iter()
                    .map(|p| display_path(p, base))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            SidecarOutcome::Stubbed { path } => ("stubbed", Color::Yellow, display_path(path, base)),
            SidecarOutcome::Skipped { reason } => ("skipped", Color::Red, describe(reason, base)),
        };
        println!(
            "  {:<NAME_WIDTH$} {} {detail}",
            sidecar.name.as_str(),
            format!("{status:<8}").with(color)
        );
    }

    let skipped = report.skipped();
    if skipped > 0 {
        println!();
        println!(
            "  {} {skipped} sidecar(s) need manual placement",
            "!".yellow().bold()
        );
    }
}

pub(crate) fn describe(reason: &SkipReason, base: &std::path::Path) -> String {
    match reason {
        SkipReason::UnresolvedTarget => "platform target could not be determined".to_string(),
        SkipReason::NoAssetForTarget { expected } => {
            format!("no release asset; place it at {}", display_path(expected, base))
        }
        SkipReason::Failed { error, expected, .. } => {
            format!("{error}; place it at {}", display_path(expected, base))
        }
    }
}
