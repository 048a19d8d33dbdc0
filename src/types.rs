use std::fmt;
use std::str::FromStr;

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoId {
    /// The owner of the repository (e.g., "facebook").
    pub owner: String,
    /// The name of the repository (e.g., "react").
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoId {
    type Err = String;

    /// Parses a GitHub `full_name` such as `"rust-lang/rust"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [owner, repo] if !owner.trim().is_empty() && !repo.trim().is_empty() => Ok(RepoId {
                owner: owner.trim().to_string(),
                repo: repo.trim().to_string(),
            }),
            _ => Err(format!("invalid repository full name: {s:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_name() {
        let id: RepoId = "octo/hello-world".parse().unwrap();
        assert_eq!(id.owner, "octo");
        assert_eq!(id.repo, "hello-world");
        assert_eq!(id.to_string(), "octo/hello-world");
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        assert!("no-slash".parse::<RepoId>().is_err());
        assert!("a/b/c".parse::<RepoId>().is_err());
        assert!("/repo".parse::<RepoId>().is_err());
    }
}
