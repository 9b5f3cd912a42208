//! Name and path validation.
//!
//! Repository names are simple identifiers. Branch names follow git-style
//! conventions. Bucket names follow the S3 DNS-compatible rules. File paths
//! are relative, slash-separated and free of `.`/`..` components.

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_BRANCH_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Validate a repository name: `[A-Za-z0-9_-]+`.
pub fn validate_repo_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(TypeError::name("repository name", name, "must not be empty"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(TypeError::name(
            "repository name",
            name,
            format!("contains forbidden character: {ch:?}"),
        ));
    }
    Ok(())
}

/// Validate a branch name.
///
/// ```
/// use strata_types::names::validate_branch_name;
///
/// assert!(validate_branch_name("master").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| Err(TypeError::name("branch name", name, reason));

    if name.is_empty() {
        return fail("must not be empty");
    }
    for ch in FORBIDDEN_BRANCH_CHARS {
        if name.contains(*ch) {
            return Err(TypeError::name(
                "branch name",
                name,
                format!("contains forbidden character: {ch:?}"),
            ));
        }
    }
    if name.contains("..") {
        return fail("must not contain '..'");
    }
    if name.contains("@{") {
        return fail("must not contain '@{'");
    }
    if name.starts_with('.') || name.ends_with('.') {
        return fail("must not start or end with '.'");
    }
    if name.starts_with('/') || name.ends_with('/') {
        return fail("must not start or end with '/'");
    }
    if name.ends_with(".lock") {
        return fail("must not end with '.lock'");
    }
    if name.split('/').any(|c| c.is_empty() || c.starts_with('.')) {
        return fail("path components must be non-empty and not start with '.'");
    }
    Ok(())
}

/// Validate a bucket name (3-63 chars of `[a-z0-9.-]`, alphanumeric at both ends).
pub fn validate_bucket_name(name: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| Err(TypeError::name("bucket name", name, reason));

    if !(3..=63).contains(&name.len()) {
        return fail("must be between 3 and 63 characters");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return fail("may only contain lowercase letters, digits, '.' and '-'");
    }
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alnum(name.chars().next()) || !alnum(name.chars().last()) {
        return fail("must start and end with a letter or digit");
    }
    if name.contains("..") {
        return fail("must not contain '..'");
    }
    Ok(())
}

/// Validate a file path inside a snapshot.
///
/// Paths are relative and compared bytewise, so `"a/b"` sorts before
/// `"a0"`. A leading slash is rejected rather than stripped; callers that
/// accept user-facing keys normalise first.
pub fn validate_path(path: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| Err(TypeError::name("path", path, reason));

    if path.is_empty() {
        return fail("must not be empty");
    }
    if path.contains('\0') {
        return fail("must not contain NUL");
    }
    if path.starts_with('/') {
        return fail("must be relative");
    }
    let body = path.strip_suffix('/').unwrap_or(path);
    for component in body.split('/') {
        match component {
            "" => return fail("must not contain empty components"),
            "." | ".." => return fail("must not contain '.' or '..' components"),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn repo_names() {
        assert!(validate_repo_name("images").is_ok());
        assert!(validate_repo_name("test_repo-1").is_ok());
        assert!(validate_repo_name("").is_err());
        assert!(validate_repo_name("has space").is_err());
        assert!(validate_repo_name("a/b").is_err());
    }

    #[test]
    fn branch_names() {
        assert!(validate_branch_name("master").is_ok());
        assert!(validate_branch_name("user/alice/fix-123").is_ok());
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name("a//b").is_err());
        assert!(validate_branch_name("main.lock").is_err());
        assert!(validate_branch_name("ref@{0}").is_err());
        assert!(validate_branch_name("feature/.hidden").is_err());
        assert!(validate_branch_name("a~b").is_err());
    }

    #[test]
    fn bucket_names() {
        assert!(validate_bucket_name("in1").is_ok());
        assert!(validate_bucket_name("out").is_ok());
        assert!(validate_bucket_name("my.bucket-2").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Upper").is_err());
        assert!(validate_bucket_name("-lead").is_err());
        assert!(validate_bucket_name("trail.").is_err());
        assert!(validate_bucket_name("a..b").is_err());
        assert!(validate_bucket_name(&"x".repeat(64)).is_err());
    }

    #[test]
    fn paths() {
        assert!(validate_path("file").is_ok());
        assert!(validate_path("dir/sub/file.txt").is_ok());
        assert!(validate_path("dir/").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/abs").is_err());
        assert!(validate_path("a//b").is_err());
        assert!(validate_path("a//b/").is_err());
        assert!(validate_path("a/../b").is_err());
        assert!(validate_path("./a").is_err());
        assert!(validate_path("a\0b").is_err());
    }

    proptest! {
        #[test]
        fn generated_bucket_names_validate(name in "[a-z0-9][a-z0-9-]{1,40}[a-z0-9]") {
            prop_assert!(validate_bucket_name(&name).is_ok());
        }

        #[test]
        fn generated_paths_validate(parts in proptest::collection::vec("[a-zA-Z0-9_]{1,8}", 1..5)) {
            prop_assert!(validate_path(&parts.join("/")).is_ok());
        }
    }
}
