//! `owner/repo` references.

/// A validated GitHub repository reference in `owner/repo` format.
///
/// # Example
///
/// ```
/// use bgr_schema::GitHubRepo;
///
/// let repo = GitHubRepo::new("artisan-build/bg-remover").unwrap();
/// assert_eq!(repo.owner(), "artisan-build");
/// assert_eq!(repo.name(), "bg-remover");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GitHubRepo(String);

impl GitHubRepo {
    /// Create a new `GitHubRepo`, validating the `owner/repo` format.
    ///
    /// # Errors
    ///
    /// Returns an error string if `s` is not in `owner/repo` format or if
    /// either component is empty.
    pub fn new(s: &str) -> Result<Self, String> {
        let s = s.trim();
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self(s.to_string()))
            }
            _ => Err(format!(
                "Invalid GitHub repo format: expected 'owner/repo', got '{s}'"
            )),
        }
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

impl TryFrom<String> for GitHubRepo {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<GitHubRepo> for String {
    fn from(repo: GitHubRepo) -> Self {
        repo.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_repos() {
        assert!(GitHubRepo::new("no-slash").is_err());
        assert!(GitHubRepo::new("/repo").is_err());
        assert!(GitHubRepo::new("owner/").is_err());
        assert!(GitHubRepo::new("a/b/c").is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let repo: GitHubRepo = serde_json::from_str("\"org/tool\"").unwrap();
        assert_eq!(repo.as_str(), "org/tool");
        assert!(serde_json::from_str::<GitHubRepo>("\"bogus\"").is_err());
    }
}
