#![deny(unsafe_code)]

//! Firmware version derivation for fwpush.
//!
//! Runs `git describe --tags --dirty` and turns the result into a validated
//! [`Version`], which can be rendered as the `AUTO_VERSION` compiler define
//! ([`BuildFlag`]) or as a Cargo `rustc-env` directive for build scripts.
//!
//! Any tag shape is accepted; nothing here assumes semantic versioning.

use std::fmt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

/// Name of the preprocessor define carrying the firmware version.
pub const DEFINE_NAME: &str = "AUTO_VERSION";

/// Suffix git appends when the working tree has uncommitted changes.
pub const DIRTY_SUFFIX: &str = "-dirty";

/// Errors from deriving or validating a version string.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git describe exited with {status}: {stderr}")]
    Git { status: String, stderr: String },

    #[error("git describe produced non-UTF-8 output")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("git describe produced an empty version (is there a tag reachable from HEAD?)")]
    Empty,

    #[error("version {0:?} contains characters that cannot be embedded in a define")]
    Invalid(String),
}

/// A validated firmware version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// Validate a version string.
    ///
    /// Surrounding whitespace is trimmed. Empty values and values containing
    /// whitespace, quotes or backslashes are rejected.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\' || c.is_control())
        {
            return Err(VersionError::Invalid(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether git marked the working tree as modified.
    pub fn is_dirty(&self) -> bool {
        self.0.ends_with(DIRTY_SUFFIX)
    }

    /// Split the version into its `git describe` components.
    pub fn describe(&self) -> Describe<'_> {
        Describe::parse(&self.0)
    }

    /// The compiler flag defining [`DEFINE_NAME`] as this version.
    pub fn build_flag(&self) -> BuildFlag {
        BuildFlag {
            version: self.clone(),
        }
    }

    /// Build-script directive exporting the version as `AUTO_VERSION`.
    ///
    /// Example: `"cargo:rustc-env=AUTO_VERSION=v1.2.0-dirty"`
    pub fn cargo_rustc_env(&self) -> String {
        format!("cargo:rustc-env={DEFINE_NAME}={}", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The components of a `git describe --tags --dirty` string.
///
/// `v1.2.0-3-gabc1234-dirty` splits into tag `v1.2.0`, 3 commits since the
/// tag, commit `abc1234`, dirty. A bare tag has no commit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Describe<'a> {
    pub tag: &'a str,
    pub commits_since_tag: Option<u32>,
    pub commit: Option<&'a str>,
    pub dirty: bool,
}

impl<'a> Describe<'a> {
    /// Parse a describe string. Never fails: anything that does not end in a
    /// `-<n>-g<hash>` group is treated as a bare tag.
    pub fn parse(s: &'a str) -> Self {
        let (rest, dirty) = match s.strip_suffix(DIRTY_SUFFIX) {
            Some(rest) if !rest.is_empty() => (rest, true),
            _ => (s, false),
        };

        let mut parts = rest.rsplitn(3, '-');
        let hash = parts.next();
        let count = parts.next();
        let tag = parts.next();

        if let (Some(hash), Some(count), Some(tag)) = (hash, count, tag) {
            let commit = hash.strip_prefix('g').filter(|h| {
                h.len() >= 4 && h.chars().all(|c| c.is_ascii_hexdigit())
            });
            let commits = count.parse::<u32>().ok();
            if let (Some(commit), Some(commits), false) = (commit, commits, tag.is_empty()) {
                return Self {
                    tag,
                    commits_since_tag: Some(commits),
                    commit: Some(commit),
                    dirty,
                };
            }
        }

        Self {
            tag: rest,
            commits_since_tag: None,
            commit: None,
            dirty,
        }
    }

    /// Whether HEAD sits exactly on the tag.
    pub fn is_exact(&self) -> bool {
        self.commits_since_tag.is_none()
    }
}

/// A compiler define wrapping a [`Version`] in escaped quotes.
///
/// Displays as `-D AUTO_VERSION=\"<version>\"`, the form a build tool passes
/// through its shell to the compiler so the define expands to a string
/// literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFlag {
    version: Version,
}

impl BuildFlag {
    pub fn define_name(&self) -> &'static str {
        DEFINE_NAME
    }

    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl fmt::Display for BuildFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-D {DEFINE_NAME}=\\\"{}\\\"", self.version)
    }
}

/// Derive the version for the current working directory.
pub fn derive_version() -> Result<Version, VersionError> {
    run_describe(&mut describe_command())
}

/// Derive the version for the repository containing `dir`.
pub fn derive_version_in(dir: &Path) -> Result<Version, VersionError> {
    let mut cmd = describe_command();
    cmd.current_dir(dir);
    run_describe(&mut cmd)
}

fn describe_command() -> Command {
    let mut cmd = Command::new("git");
    cmd.args(["describe", "--tags", "--dirty"]);
    cmd
}

fn run_describe(cmd: &mut Command) -> Result<Version, VersionError> {
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(VersionError::Git {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    let stdout = String::from_utf8(output.stdout)?;
    let version = Version::parse(&stdout)?;
    debug!(version = %version, "Derived firmware version");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_trims_newline() {
        let v = Version::parse("v1.2.0\n").unwrap();
        assert_eq!(v.as_str(), "v1.2.0");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(Version::parse(""), Err(VersionError::Empty)));
        assert!(matches!(Version::parse("  \n"), Err(VersionError::Empty)));
    }

    #[test]
    fn test_parse_rejects_quotes() {
        assert!(matches!(
            Version::parse("v1\"; rm"),
            Err(VersionError::Invalid(_))
        ));
        assert!(Version::parse("two words").is_err());
        assert!(Version::parse("back\\slash").is_err());
    }

    #[test]
    fn test_build_flag_format() {
        let v = Version::parse("v1.0.3-dirty").unwrap();
        assert_eq!(
            v.build_flag().to_string(),
            r#"-D AUTO_VERSION=\"v1.0.3-dirty\""#
        );
        assert_eq!(v.build_flag().define_name(), "AUTO_VERSION");
    }

    #[test]
    fn test_cargo_rustc_env() {
        let v = Version::parse("release-7").unwrap();
        assert_eq!(v.cargo_rustc_env(), "cargo:rustc-env=AUTO_VERSION=release-7");
    }

    #[test]
    fn test_describe_bare_tag() {
        let d = Describe::parse("v2.1.0");
        assert_eq!(d.tag, "v2.1.0");
        assert!(d.is_exact());
        assert!(!d.dirty);
    }

    #[test]
    fn test_describe_full() {
        let d = Describe::parse("v2.1.0-14-g3f2a9c1-dirty");
        assert_eq!(d.tag, "v2.1.0");
        assert_eq!(d.commits_since_tag, Some(14));
        assert_eq!(d.commit, Some("3f2a9c1"));
        assert!(d.dirty);
    }

    #[test]
    fn test_describe_tag_with_dashes() {
        let d = Describe::parse("fw-beta-rc1-2-gdeadbeef");
        assert_eq!(d.tag, "fw-beta-rc1");
        assert_eq!(d.commits_since_tag, Some(2));

        // Not a describe suffix: the whole thing is the tag.
        let d = Describe::parse("fw-beta-rc1");
        assert_eq!(d.tag, "fw-beta-rc1");
        assert!(d.is_exact());
    }

    #[test]
    fn test_describe_dirty_only() {
        let d = Describe::parse("nightly-dirty");
        assert_eq!(d.tag, "nightly");
        assert!(d.dirty);

        let v = Version::parse("nightly-dirty").unwrap();
        assert!(v.is_dirty());
    }

    #[test]
    fn test_derive_outside_repository_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        // Either git is missing (Spawn) or it reports "not a git repository".
        let result = derive_version_in(dir.path());
        assert!(result.is_err());
    }
}
