//! Build-time metadata embedded by the build script.
//!
//! fwpush versions itself the same way it versions firmware: with
//! `git describe --tags --dirty`.

/// `git describe --tags --dirty` at build time, or `"unknown"`.
pub const GIT_DESCRIBE: &str = env!("FWPUSH_GIT_DESCRIBE");

/// The build profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("FWPUSH_BUILD_PROFILE");

/// The crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version line shown by `fwpush --version`.
///
/// Example: `"0.1.0 (v0.1.0-3-g1a2b3c4, debug)"`
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("FWPUSH_GIT_DESCRIBE"),
    ", ",
    env!("FWPUSH_BUILD_PROFILE"),
    ")"
);

/// Return a formatted version string including git describe and profile.
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_DESCRIBE}, {BUILD_PROFILE})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_matches_long_version() {
        let v = version_string();
        assert!(v.contains(VERSION));
        assert_eq!(v, LONG_VERSION);
    }

    #[test]
    fn test_git_describe_not_empty() {
        assert!(!GIT_DESCRIBE.is_empty());
    }

    #[test]
    fn test_build_profile() {
        // In test mode, profile is "debug"
        assert_eq!(BUILD_PROFILE, "debug");
    }
}
