//! `sidecars plan`

use anyhow::{Context, Result};
use crossterm::style::{Color, Stylize};
use sidecar_core::io::download::HttpFetcher;
use sidecar_core::{PlanAction, ProvisionConfig, ProvisionError, Provisioner, Reporter, TargetResolver};

use super::fetch::describe;
use super::{display_path, skipped_message};
use crate::TargetArgs;
use crate::ui::{ConsoleReporter, NAME_WIDTH};

/// Dry run: print what `fetch` would do.
pub fn plan(config: ProvisionConfig, args: &TargetArgs) -> Result<()> {
    let project_dir = config.project_dir.clone();
    // Planning never sends a request; the client only satisfies the constructor.
    let fetcher = HttpFetcher::new(config.timeout).context("Failed to build HTTP client")?;
    let reporter = std::sync::Arc::new(ConsoleReporter::new(args.json));
    let provisioner = Provisioner::new(config, TargetResolver::for_host(), fetcher, reporter.clone());

    let plan = match provisioner.plan(args.target.as_ref()) {
        Ok(plan) => plan,
        Err(ProvisionError::MissingOrEmptyVersionTag(err)) => {
            reporter.warning(&skipped_message(&err));
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let target = plan
        .target
        .as_ref()
        .map_or_else(|| "unresolved".to_string(), ToString::to_string);
    println!();
    println!("  {} {} ({target})", "plan".bold(), plan.version);
    for sidecar in &plan.sidecars {
        let (action, color, detail) = match &sidecar.action {
            PlanAction::UseCached { path } => {
                ("cached", Color::DarkGrey, display_path(path, &project_dir))
            }
            PlanAction::Download { url, .. } => ("download", Color::Cyan, url.clone()),
            PlanAction::Stub { path } => ("stub", Color::Yellow, display_path(path, &project_dir)),
            PlanAction::Skip { reason } => ("skip", Color::Red, describe(reason, &project_dir)),
        };
        println!(
            "  {:<NAME_WIDTH$} {} {detail}",
            sidecar.name.as_str(),
            format!("{action:<8}").with(color)
        );
    }
    Ok(())
}
