use crate::artifacts::branch::INVALID_BRANCH_NAME_REGEX;
use anyhow::Context;
use derive_new::new;

/// Full path of a ref relative to the repository dir, e.g. `refs/heads/main`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, new)]
pub struct SymRefName(String);

impl SymRefName {
    pub fn as_ref_path(&self) -> &str {
        &self.0
    }
}

/// A syntactically valid ref name, short (`main`) or full (`refs/tags/v1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: String) -> anyhow::Result<Self> {
        if name.is_empty() {
            anyhow::bail!("branch name cannot be empty");
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX)
            .with_context(|| format!("invalid branch name regex: {INVALID_BRANCH_NAME_REGEX}"))?;

        if re.is_match(&name) {
            anyhow::bail!("invalid branch name: {}", name);
        } else {
            Ok(Self(name))
        }
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("main")]
    #[case("feature/new-feature")]
    #[case("refs/tags/v1.0")]
    #[case("origin/main")]
    #[case("HEAD")]
    fn accepts_ref_names(#[case] name: &str) {
        assert!(BranchName::try_parse(name.to_string()).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("a..b")]
    #[case("trailing/")]
    #[case("x.lock")]
    #[case("at@{brace")]
    fn rejects_malformed_names(#[case] name: &str) {
        assert!(BranchName::try_parse(name.to_string()).is_err());
    }
}
