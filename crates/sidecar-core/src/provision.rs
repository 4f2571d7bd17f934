//! Provisioning orchestration.
//!
//! One [`Provisioner::run`] reads the version pin, resolves the platform
//! target and walks the catalog in order. Each sidecar ends up cached,
//! freshly provisioned, stubbed, or skipped with a warning; a failure for one
//! sidecar never stops the others.

use std::path::PathBuf;

use serde::Serialize;
use sidecar_schema::{AssetEntry, PlatformTarget, SidecarName, VersionTag};
use thiserror::Error;

use crate::cache::{CacheOutcome, SidecarCache};
use crate::catalog::{AssetCatalog, SidecarSpec};
use crate::config::{ConfigError, ProvisionConfig};
use crate::io::download::Fetcher;
use crate::repo::ReleaseSource;
use crate::reporter::Reporter;
use crate::resolver::TargetResolver;
use crate::stub::{StubOutcome, ensure_stub};
use crate::version::{VersionError, read_version_tag};

/// Errors that abort a whole run.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Missing or empty version tag: {0}")]
    MissingOrEmptyVersionTag(#[from] VersionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why a sidecar was not provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No override was given and the host is not in the host table.
    UnresolvedTarget,
    /// A required sidecar has no asset for the target.
    NoAssetForTarget { expected: PathBuf },
    /// Download, extraction or write failed.
    Failed {
        url: Option<String>,
        expected: PathBuf,
        error: String,
    },
}

/// What happened to one sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SidecarOutcome {
    AlreadyPresent { path: PathBuf },
    Provisioned { paths: Vec<PathBuf> },
    Stubbed { path: PathBuf },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidecarReport {
    pub name: SidecarName,
    pub outcome: SidecarOutcome,
}

/// Result of a provisioning run, one entry per sidecar in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub version: VersionTag,
    pub target: Option<PlatformTarget>,
    pub sidecars: Vec<SidecarReport>,
}

impl ProvisionReport {
    /// Report entry for `name`.
    pub fn get(&self, name: &str) -> Option<&SidecarOutcome> {
        self.sidecars
            .iter()
            .find(|report| report.name == *name)
            .map(|report| &report.outcome)
    }

    /// Number of sidecars that ended up skipped.
    pub fn skipped(&self) -> usize {
        self.sidecars
            .iter()
            .filter(|report| matches!(report.outcome, SidecarOutcome::Skipped { .. }))
            .count()
    }
}

/// A dry-run decision for one sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanAction {
    UseCached { path: PathBuf },
    Download { url: String, outputs: Vec<PathBuf> },
    Stub { path: PathBuf },
    Skip { reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSidecar {
    pub name: SidecarName,
    pub action: PlanAction,
}

/// What [`Provisioner::run`] would do, computed without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionPlan {
    pub version: VersionTag,
    pub target: Option<PlatformTarget>,
    pub sidecars: Vec<PlannedSidecar>,
}

pub struct Provisioner {
    resolver: TargetResolver,
    catalog: AssetCatalog,
    source: ReleaseSource,
    cache: SidecarCache,
    version_file: PathBuf,
    fetcher: Box<dyn Fetcher>,
    reporter: Box<dyn Reporter>,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("resolver", &self.resolver)
            .field("source", &self.source)
            .field("cache", &self.cache)
            .field("version_file", &self.version_file)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    pub fn new(
        config: ProvisionConfig,
        resolver: TargetResolver,
        fetcher: impl Fetcher + 'static,
        reporter: impl Reporter + 'static,
    ) -> Self {
        Self {
            resolver,
            catalog: config.catalog,
            source: config.source,
            cache: SidecarCache::new(config.cache_dir),
            version_file: config.version_file,
            fetcher: Box::new(fetcher),
            reporter: Box::new(reporter),
        }
    }

    pub fn cache(&self) -> &SidecarCache {
        &self.cache
    }

    /// Provision every sidecar in the catalog.
    ///
    /// Only a missing or empty version pin aborts the run; everything else is
    /// recorded per sidecar in the report.
    pub async fn run(
        &self,
        target_override: Option<&PlatformTarget>,
    ) -> Result<ProvisionReport, ProvisionError> {
        let version = read_version_tag(&self.version_file)?;
        let target = self.resolve(target_override);

        self.reporter
            .section(&format!("Provisioning sidecars for {version}"));
        if let Some(target) = &target {
            self.reporter.info(&format!(
                "Target {target}, writing to {}",
                self.cache.root().display()
            ));
        }

        let mut sidecars = Vec::with_capacity(self.catalog.len());
        for spec in self.catalog.sidecars() {
            let outcome = match &target {
                Some(target) => self.provision_one(spec, &version, target).await,
                None => SidecarOutcome::Skipped {
                    reason: SkipReason::UnresolvedTarget,
                },
            };
            sidecars.push(SidecarReport {
                name: spec.name().clone(),
                outcome,
            });
        }

        Ok(ProvisionReport {
            version,
            target,
            sidecars,
        })
    }

    /// Compute what [`run`](Self::run) would do. No network access and no
    /// filesystem writes.
    pub fn plan(
        &self,
        target_override: Option<&PlatformTarget>,
    ) -> Result<ProvisionPlan, ProvisionError> {
        let version = read_version_tag(&self.version_file)?;
        let target = self.resolve(target_override);

        let sidecars = self
            .catalog
            .sidecars()
            .map(|spec| PlannedSidecar {
                name: spec.name().clone(),
                action: match &target {
                    Some(target) => self.plan_one(spec, &version, target),
                    None => PlanAction::Skip {
                        reason: SkipReason::UnresolvedTarget,
                    },
                },
            })
            .collect();

        Ok(ProvisionPlan {
            version,
            target,
            sidecars,
        })
    }

    fn resolve(&self, target_override: Option<&PlatformTarget>) -> Option<PlatformTarget> {
        let target = self.resolver.resolve(target_override);
        if target.is_none() {
            let msg = format!(
                "Cannot determine the platform target for host {}; pass --target or set SIDECAR_TARGET. Skipping all sidecars.",
                self.resolver.host()
            );
            tracing::warn!("{msg}");
            self.reporter.warning(&msg);
        }
        target
    }

    fn plan_one(
        &self,
        spec: &SidecarSpec,
        version: &VersionTag,
        target: &PlatformTarget,
    ) -> PlanAction {
        let name = spec.name();
        let dest = self.cache.destination(name, target);
        if dest.exists() {
            return PlanAction::UseCached { path: dest };
        }

        match spec.asset(target) {
            Some(entry) => PlanAction::Download {
                url: self.source.asset_url(version, entry.file_name()),
                outputs: entry
                    .outputs(name)
                    .iter()
                    .map(|output| self.cache.destination(output, target))
                    .collect(),
            },
            None if spec.required() => PlanAction::Skip {
                reason: SkipReason::NoAssetForTarget { expected: dest },
            },
            None => PlanAction::Stub { path: dest },
        }
    }

    async fn provision_one(
        &self,
        spec: &SidecarSpec,
        version: &VersionTag,
        target: &PlatformTarget,
    ) -> SidecarOutcome {
        let name = spec.name();
        let dest = self.cache.destination(name, target);

        match spec.asset(target) {
            Some(entry) => self.fetch_asset(name, target, entry, version, dest).await,
            None if spec.required() => {
                let msg = format!(
                    "No {name} release asset for {target}. Build or download it manually and place it at {}",
                    dest.display()
                );
                tracing::warn!("{msg}");
                self.reporter.warning(&msg);
                SidecarOutcome::Skipped {
                    reason: SkipReason::NoAssetForTarget { expected: dest },
                }
            }
            None => match ensure_stub(&self.cache, name, target) {
                Ok(StubOutcome::Written(path)) => {
                    self.reporter
                        .done(name, &format!("stub (not available for {target})"));
                    SidecarOutcome::Stubbed { path }
                }
                Ok(StubOutcome::AlreadyPresent(path)) => {
                    self.reporter.done(name, "already present");
                    SidecarOutcome::AlreadyPresent { path }
                }
                Err(e) => self.failed(name, None, dest, &e),
            },
        }
    }

    async fn fetch_asset(
        &self,
        name: &SidecarName,
        target: &PlatformTarget,
        entry: &AssetEntry,
        version: &VersionTag,
        dest: PathBuf,
    ) -> SidecarOutcome {
        let url = self.source.asset_url(version, entry.file_name());
        let result = self
            .cache
            .ensure(
                name,
                target,
                entry,
                &url,
                self.fetcher.as_ref(),
                self.reporter.as_ref(),
            )
            .await;

        match result {
            Ok(CacheOutcome::AlreadyPresent(path)) => {
                tracing::debug!(sidecar = %name, path = %path.display(), "already present");
                self.reporter.done(name, "already present");
                SidecarOutcome::AlreadyPresent { path }
            }
            Ok(CacheOutcome::Written(paths)) => {
                tracing::info!(sidecar = %name, %target, files = paths.len(), "provisioned");
                self.reporter.done(name, &format!("{version} ({target})"));
                SidecarOutcome::Provisioned { paths }
            }
            Err(e) => self.failed(name, Some(url), dest, &e),
        }
    }

    fn failed(
        &self,
        name: &SidecarName,
        url: Option<String>,
        expected: PathBuf,
        error: &dyn std::error::Error,
    ) -> SidecarOutcome {
        let msg = match &url {
            Some(url) => format!(
                "Failed to provision {name} from {url}: {error}. Place the binary manually at {}",
                expected.display()
            ),
            None => format!(
                "Failed to provision {name}: {error}. Place the binary manually at {}",
                expected.display()
            ),
        };
        tracing::warn!("{msg}");
        self.reporter.warning(&msg);

        SidecarOutcome::Skipped {
            reason: SkipReason::Failed {
                url,
                expected,
                error: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use crate::io::download::DownloadError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Serves every URL with the same body and counts requests.
    #[derive(Clone, Default)]
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(
            &self,
            _: &SidecarName,
            _: &str,
            _: &dyn Reporter,
        ) -> Result<Bytes, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"binary"))
        }
    }

    const CONFIG: &str = r#"
[release]
host = "https://releases.invalid"
repo = "acme/tools"

[[sidecar]]
name = "engine"
required = true

[sidecar.assets.x86_64-unknown-linux-gnu]
file = "engine-linux-amd64"

[[sidecar]]
name = "helper"

[sidecar.assets.x86_64-unknown-linux-gnu]
file = "helper-linux-amd64"
"#;

    fn setup(project: &Path, fetcher: CountingFetcher, host: (&str, &str)) -> Provisioner {
        std::fs::write(project.join(".sidecar-version"), "v1.0.0\n").unwrap();
        let config = ProvisionConfig::from_toml_str(project, CONFIG).unwrap();
        Provisioner::new(
            config,
            TargetResolver::with_host(host.0, host.1),
            fetcher,
            NullReporter,
        )
    }

    fn target(s: &str) -> PlatformTarget {
        PlatformTarget::new(s).unwrap()
    }

    #[test]
    fn test_plan_has_no_side_effects() {
        let dir = tempdir().unwrap();
        let fetcher = CountingFetcher::default();
        let provisioner = setup(dir.path(), fetcher.clone(), ("linux", "x86_64"));

        let plan = provisioner.plan(None).unwrap();
        assert_eq!(plan.target, Some(target("x86_64-unknown-linux-gnu")));
        assert_eq!(
            plan.sidecars[0].action,
            PlanAction::Download {
                url: "https://releases.invalid/acme/tools/releases/download/v1.0.0/engine-linux-amd64"
                    .to_string(),
                outputs: vec![dir.path().join("build/binaries/engine-x86_64-unknown-linux-gnu")],
            }
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn test_plan_for_unpublished_target() {
        let dir = tempdir().unwrap();
        let provisioner = setup(dir.path(), CountingFetcher::default(), ("linux", "x86_64"));

        let plan = provisioner.plan(Some(&target("aarch64-apple-darwin"))).unwrap();
        let cache = dir.path().join("build/binaries");
        assert_eq!(
            plan.sidecars[0].action,
            PlanAction::Skip {
                reason: SkipReason::NoAssetForTarget {
                    expected: cache.join("engine-aarch64-apple-darwin"),
                },
            }
        );
        assert_eq!(
            plan.sidecars[1].action,
            PlanAction::Stub {
                path: cache.join("helper-aarch64-apple-darwin"),
            }
        );
    }

    #[tokio::test]
    async fn test_unresolved_target_skips_everything() {
        let dir = tempdir().unwrap();
        let fetcher = CountingFetcher::default();
        let provisioner = setup(dir.path(), fetcher.clone(), ("haiku", "m68k"));

        let report = provisioner.run(None).await.unwrap();
        assert_eq!(report.target, None);
        assert_eq!(report.skipped(), 2);
        assert!(report.sidecars.iter().all(|s| s.outcome
            == SidecarOutcome::Skipped {
                reason: SkipReason::UnresolvedTarget
            }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_version_pin_aborts() {
        let dir = tempdir().unwrap();
        let config = ProvisionConfig::from_toml_str(dir.path(), CONFIG).unwrap();
        let provisioner = Provisioner::new(
            config,
            TargetResolver::with_host("linux", "x86_64"),
            CountingFetcher::default(),
            NullReporter,
        );

        let err = provisioner.run(None).await.unwrap_err();
        assert!(matches!(err, ProvisionError::MissingOrEmptyVersionTag(_)));
        assert!(provisioner.plan(None).is_err());
    }

    #[tokio::test]
    async fn test_required_without_asset_is_skipped_and_optional_is_stubbed() {
        let dir = tempdir().unwrap();
        let fetcher = CountingFetcher::default();
        let provisioner = setup(dir.path(), fetcher.clone(), ("linux", "x86_64"));

        let mac = target("aarch64-apple-darwin");
        let report = provisioner.run(Some(&mac)).await.unwrap();
        let cache = dir.path().join("build/binaries");

        assert_eq!(
            report.get("engine"),
            Some(&SidecarOutcome::Skipped {
                reason: SkipReason::NoAssetForTarget {
                    expected: cache.join("engine-aarch64-apple-darwin"),
                },
            })
        );
        assert_eq!(
            report.get("helper"),
            Some(&SidecarOutcome::Stubbed {
                path: cache.join("helper-aarch64-apple-darwin"),
            })
        );
        assert!(!cache.join("engine-aarch64-apple-darwin").exists());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_report_serializes_for_packaging() {
        let dir = tempdir().unwrap();
        let provisioner = setup(dir.path(), CountingFetcher::default(), ("linux", "x86_64"));

        let report = provisioner.run(None).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["version"], "v1.0.0");
        assert_eq!(json["target"], "x86_64-unknown-linux-gnu");
        assert_eq!(json["sidecars"][0]["name"], "engine");
        assert_eq!(json["sidecars"][0]["outcome"]["status"], "provisioned");
    }
}
