#![deny(unsafe_code)]

//! fwpush core: firmware upload and the post-build hook.
//!
//! The [`upload`] module sends a firmware image to a device's `/firmware`
//! endpoint; the [`hook`] module is what a build tool calls once the image
//! exists. Version derivation lives in the `fwpush-version` crate.

/// Compile-time build metadata (version, git describe, profile).
pub mod build_info;
/// Basic-auth credentials with a redacted, zeroized password.
pub mod credentials;
/// Post-build hook: explicit project options in, one upload out.
pub mod hook;
/// Multipart HTTP firmware upload.
pub mod upload;

pub use credentials::Credentials;
pub use hook::{HookError, PostBuildContext, ProjectOptions, on_post_build};
pub use upload::{UploadError, UploadOutcome, UploadRequest, Uploader};
