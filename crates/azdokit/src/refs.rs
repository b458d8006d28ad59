//! Ref resolution.
//!
//! A branch is created from exactly one ref source: another branch, a raw
//! commit id, or a tag. [`RefResolver`] turns that source into the commit it
//! points at, or fails with the service's own "No refs found" wording.
//!
//! When more than one source is supplied the precedence is
//! branch > commit > tag; the others are ignored with a warning.

use crate::error::{Error, Result};
use crate::remote::Remote;
use crate::types::BranchSpec;
use reconcile::OperationContext;
use serde::Serialize;
use std::fmt;

/// Prefix of branch refs.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Prefix of tag refs.
pub const TAGS_PREFIX: &str = "refs/tags/";

/// Fully-qualified branch ref for `name` (accepts an already-qualified name).
pub fn heads_ref(name: &str) -> String {
    qualify(HEADS_PREFIX, name)
}

/// Fully-qualified tag ref for `name` (accepts an already-qualified name).
pub fn tags_ref(name: &str) -> String {
    qualify(TAGS_PREFIX, name)
}

fn qualify(prefix: &str, name: &str) -> String {
    if name.starts_with(prefix) {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}

/// Branch name without the `refs/heads/` prefix.
pub fn short_branch_name(name: &str) -> &str {
    name.strip_prefix(HEADS_PREFIX).unwrap_or(name)
}

/// Check a branch name against git's ref format rules.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Err(Error::invalid_input(format!("invalid branch name '{name}': {reason}")));

    if name.trim().is_empty() {
        return invalid("name is empty");
    }
    if name.starts_with("refs/") {
        return invalid("use the short name without refs/heads/");
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return invalid("empty path component");
    }
    if name.ends_with('.') || name.ends_with(".lock") {
        return invalid("must not end with '.' or '.lock'");
    }
    if name.contains("..") || name.contains("@{") || name == "@" {
        return invalid("contains '..' or '@{'");
    }
    if name.split('/').any(|part| part.starts_with('.')) {
        return invalid("a component starts with '.'");
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_ascii_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
    {
        return invalid(&format!("contains forbidden character {c:?}"));
    }
    Ok(())
}

/// Which input a branch is created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefSource {
    /// The tip of another branch.
    Branch,
    /// A raw commit id.
    Commit,
    /// The commit a tag points at.
    Tag,
}

impl RefSource {
    /// Name of the desired-state field carrying this source.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Branch => "ref_branch",
            Self::Commit => "ref_commit_id",
            Self::Tag => "ref_tag",
        }
    }
}

impl fmt::Display for RefSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Branch => "branch",
            Self::Commit => "commit",
            Self::Tag => "tag",
        };
        f.write_str(name)
    }
}

/// The ref source inputs of a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefSpec {
    /// Branch name.
    pub branch: Option<String>,
    /// Commit id.
    pub commit_id: Option<String>,
    /// Tag name.
    pub tag: Option<String>,
}

impl RefSpec {
    /// Supplied sources in precedence order; empty strings count as absent.
    pub fn supplied(&self) -> Vec<(RefSource, &str)> {
        [
            (RefSource::Branch, self.branch.as_deref()),
            (RefSource::Commit, self.commit_id.as_deref()),
            (RefSource::Tag, self.tag.as_deref()),
        ]
        .into_iter()
        .filter_map(|(source, value)| {
            let value = value?.trim();
            (!value.is_empty()).then_some((source, value))
        })
        .collect()
    }

    /// Whether no source is supplied.
    pub fn is_empty(&self) -> bool {
        self.supplied().is_empty()
    }
}

impl From<&BranchSpec> for RefSpec {
    fn from(spec: &BranchSpec) -> Self {
        Self {
            branch: spec.ref_branch.clone(),
            commit_id: spec.ref_commit_id.clone(),
            tag: spec.ref_tag.clone(),
        }
    }
}

/// A ref source resolved to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRef {
    /// Which input won.
    pub source: RefSource,
    /// Fully-qualified ref (or the raw commit id) that was looked up.
    pub requested: String,
    /// Commit the source points at.
    pub commit_id: String,
}

/// Resolves ref sources against a repository.
#[derive(Clone)]
pub struct RefResolver {
    remote: Remote,
}

impl RefResolver {
    pub(crate) fn new(remote: Remote) -> Self {
        Self { remote }
    }

    /// Resolve the winning source of `spec` in `repository_id`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingRef`] if no source is supplied
    /// - [`Error::RefNotFound`] if the winning source does not resolve
    /// - any backend error, unchanged
    pub fn resolve(
        &self,
        ctx: &OperationContext,
        repository_id: &str,
        spec: &RefSpec,
    ) -> Result<ResolvedRef> {
        let supplied = spec.supplied();
        let Some(&(source, value)) = supplied.first() else {
            return Err(Error::MissingRef);
        };
        if supplied.len() > 1 {
            let ignored: Vec<&str> = supplied[1..].iter().map(|(s, _)| s.field()).collect();
            log::warn!(
                "Several ref sources supplied; using {} and ignoring {}",
                source.field(),
                ignored.join(", ")
            );
        }

        let resolved = match source {
            RefSource::Branch => self.lookup(ctx, repository_id, source, heads_ref(value))?,
            RefSource::Tag => self.lookup(ctx, repository_id, source, tags_ref(value))?,
            RefSource::Commit => {
                let what = format!("get commit {value}");
                let commit = self
                    .remote
                    .read(ctx, &what, |b| b.get_commit(repository_id, value))?
                    .ok_or_else(|| Error::ref_not_found(value))?;
                ResolvedRef {
                    source,
                    requested: value.to_string(),
                    commit_id: commit.commit_id,
                }
            }
        };
        log::debug!(
            "Resolved {} {} to {}",
            resolved.source,
            resolved.requested,
            resolved.commit_id
        );
        Ok(resolved)
    }

    /// Look up a fully-qualified ref by exact name.
    fn lookup(
        &self,
        ctx: &OperationContext,
        repository_id: &str,
        source: RefSource,
        full_name: String,
    ) -> Result<ResolvedRef> {
        let filter = full_name.strip_prefix("refs/").unwrap_or(&full_name);
        let what = format!("list refs {filter}");
        let refs = self
            .remote
            .read(ctx, &what, |b| b.list_refs(repository_id, filter))?;
        let found = refs.into_iter().find(|r| r.name == full_name);

        match found {
            Some(git_ref) => Ok(ResolvedRef {
                source,
                commit_id: git_ref.commit_id().to_string(),
                requested: full_name,
            }),
            None => Err(Error::ref_not_found(full_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::error::ErrorCategory;
    use crate::types::RetryConfig;
    use regex::Regex;
    use std::sync::Arc;

    struct Fixture {
        mock: MockBackend,
        resolver: RefResolver,
        repo: String,
        master: String,
    }

    fn fixture() -> Fixture {
        let mock = MockBackend::new();
        let project = mock.seed_project("demo");
        let repo = mock.seed_repository(&project.id, "app").id;
        let master = mock.seed_commit(&repo, "refs/heads/master", "initial");
        let remote = Remote::new(Arc::new(mock.clone()), RetryConfig::no_retry());
        Fixture {
            mock,
            resolver: RefResolver::new(remote),
            repo,
            master,
        }
    }

    fn spec(branch: Option<&str>, commit: Option<&str>, tag: Option<&str>) -> RefSpec {
        RefSpec {
            branch: branch.map(str::to_string),
            commit_id: commit.map(str::to_string),
            tag: tag.map(str::to_string),
        }
    }

    #[test]
    fn test_qualify_helpers() {
        assert_eq!(heads_ref("master"), "refs/heads/master");
        assert_eq!(heads_ref("refs/heads/master"), "refs/heads/master");
        assert_eq!(tags_ref("v1"), "refs/tags/v1");
        assert_eq!(short_branch_name("refs/heads/feature/x"), "feature/x");
    }

    #[test]
    fn test_validate_branch_name() {
        assert!(validate_branch_name("feature/login").is_ok());
        assert!(validate_branch_name("testbranch-1a2b").is_ok());

        for bad in ["", "refs/heads/x", "a..b", "a b", "x.lock", "/x", "x/", "a//b", ".hidden", "a~1", "a:b"] {
            let err = validate_branch_name(bad).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Fatal, "{bad}");
        }
    }

    #[test]
    fn test_resolve_branch() {
        let f = fixture();
        let resolved = f
            .resolver
            .resolve(&OperationContext::new(), &f.repo, &spec(Some("master"), None, None))
            .unwrap();
        assert_eq!(resolved.source, RefSource::Branch);
        assert_eq!(resolved.requested, "refs/heads/master");
        assert_eq!(resolved.commit_id, f.master);
    }

    #[test]
    fn test_resolve_commit() {
        let f = fixture();
        let resolved = f
            .resolver
            .resolve(&OperationContext::new(), &f.repo, &spec(None, Some(&f.master), None))
            .unwrap();
        assert_eq!(resolved.source, RefSource::Commit);
        assert_eq!(resolved.commit_id, f.master);
    }

    #[test]
    fn test_resolve_tags_lightweight_and_annotated() {
        let f = fixture();
        f.mock.set_ref(&f.repo, "refs/tags/v1", &f.master);
        f.mock.seed_annotated_tag(&f.repo, "v2", &f.master);
        let ctx = OperationContext::new();

        let v1 = f.resolver.resolve(&ctx, &f.repo, &spec(None, None, Some("v1"))).unwrap();
        let v2 = f.resolver.resolve(&ctx, &f.repo, &spec(None, None, Some("v2"))).unwrap();

        assert_eq!(v1.commit_id, f.master);
        assert_eq!(v2.commit_id, f.master);
        assert_eq!(v2.requested, "refs/tags/v2");
    }

    #[test]
    fn test_prefix_match_is_not_exact_match() {
        let f = fixture();
        f.mock.set_ref(&f.repo, "refs/tags/0.0.0-rc1", &f.master);

        let err = f
            .resolver
            .resolve(&OperationContext::new(), &f.repo, &spec(None, None, Some("0.0.0")))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::RefNotFound);
    }

    #[test]
    fn test_not_found_messages() {
        let f = fixture();
        let ctx = OperationContext::new();
        let cases = [
            (spec(None, None, Some("0.0.0")), r#"No refs found that match ref "refs/tags/0\.0\.0""#),
            (spec(Some("nope"), None, None), r#"No refs found that match ref "refs/heads/nope""#),
            (
                spec(None, Some("0123456789abcdef0123456789abcdef01234567"), None),
                r#"No refs found that match ref "0123456789abcdef0123456789abcdef01234567""#,
            ),
        ];

        for (input, pattern) in cases {
            let err = f.resolver.resolve(&ctx, &f.repo, &input).unwrap_err();
            let re = Regex::new(pattern).unwrap();
            assert!(re.is_match(&err.to_string()), "{err}");
        }
    }

    #[test]
    fn test_missing_ref() {
        let f = fixture();
        let ctx = OperationContext::new();

        let err = f.resolver.resolve(&ctx, &f.repo, &RefSpec::default()).unwrap_err();
        assert!(matches!(err, Error::MissingRef));

        let err = f
            .resolver
            .resolve(&ctx, &f.repo, &spec(Some(""), Some("  "), None))
            .unwrap_err();
        assert!(matches!(err, Error::MissingRef));
    }

    #[test]
    fn test_precedence_branch_over_commit_over_tag() {
        let f = fixture();
        let other = f.mock.seed_commit(&f.repo, "refs/tags/v1", "tagged");
        let dangling = f.mock.seed_dangling_commit(&f.repo, "loose");
        let ctx = OperationContext::new();

        let all = f
            .resolver
            .resolve(&ctx, &f.repo, &spec(Some("master"), Some(&dangling), Some("v1")))
            .unwrap();
        assert_eq!(all.source, RefSource::Branch);
        assert_eq!(all.commit_id, f.master);

        let commit_and_tag = f
            .resolver
            .resolve(&ctx, &f.repo, &spec(None, Some(&dangling), Some("v1")))
            .unwrap();
        assert_eq!(commit_and_tag.source, RefSource::Commit);
        assert_eq!(commit_and_tag.commit_id, dangling);
        assert_ne!(commit_and_tag.commit_id, other);
    }

    #[test]
    fn test_losing_source_is_not_validated() {
        let f = fixture();
        let resolved = f
            .resolver
            .resolve(
                &OperationContext::new(),
                &f.repo,
                &spec(Some("master"), None, Some("does-not-exist")),
            )
            .unwrap();
        assert_eq!(resolved.commit_id, f.master);
    }

    #[test]
    fn test_unknown_repository_is_not_found() {
        let f = fixture();
        let err = f
            .resolver
            .resolve(&OperationContext::new(), "missing", &spec(Some("master"), None, None))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cancelled_context() {
        let f = fixture();
        let ctx = OperationContext::new();
        ctx.token().cancel();

        let err = f
            .resolver
            .resolve(&ctx, &f.repo, &spec(Some("master"), None, None))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Interrupted);
        assert_eq!(f.mock.calls("list_refs"), 0);
    }
}
