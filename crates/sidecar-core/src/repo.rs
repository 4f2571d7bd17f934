use sidecar_schema::VersionTag;

/// A validated GitHub repository reference in `owner/repo` format.
///
/// # Example
///
/// ```
/// use sidecar_core::repo::GitHubRepo;
///
/// let repo = GitHubRepo::new("thewh1teagle/sona").unwrap();
/// assert_eq!(repo.owner(), "thewh1teagle");
/// assert_eq!(repo.name(), "sona");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct GitHubRepo(String);

impl GitHubRepo {
    /// Create a new `GitHubRepo`, validating the `owner/repo` format.
    ///
    /// # Errors
    ///
    /// Returns an error string if `s` is not in `owner/repo` format or if
    /// either component is empty or contains whitespace.
    pub fn new(s: &str) -> Result<Self, String> {
        let mut parts = s.split('/');
        if let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) {
            let valid = |part: &str| !part.is_empty() && !part.chars().any(char::is_whitespace);
            if valid(owner) && valid(name) {
                return Ok(Self(s.to_string()));
            }
        }
        Err(format!(
            "Invalid GitHub repo format: expected 'owner/repo', got '{s}'"
        ))
    }

    /// Get the owner part.
    pub fn owner(&self) -> &str {
        self.0.split('/').next().unwrap_or("")
    }

    /// Get the repo name part.
    pub fn name(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or("")
    }

    /// Return the raw `owner/repo` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where release assets are downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    host: String,
    repo: GitHubRepo,
}

impl ReleaseSource {
    /// Create a release source. Trailing slashes on `host` are dropped.
    pub fn new(host: &str, repo: GitHubRepo) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            repo,
        }
    }

    /// Release host, e.g. `https://github.com`.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Repository the releases belong to.
    pub fn repo(&self) -> &GitHubRepo {
        &self.repo
    }

    /// `{host}/{owner}/{repo}/releases/download/{tag}/{file}`
    pub fn asset_url(&self, tag: &VersionTag, file: &str) -> String {
        format!(
            "{}/{}/{}/releases/download/{}/{}",
            self.host,
            self.repo.owner(),
            self.repo.name(),
            tag,
            file
        )
    }
}
