//! Post-build upload hook.
//!
//! The build tool calls [`on_post_build`] once the firmware image exists.
//! Connection options arrive as an explicit [`ProjectOptions`] value and are
//! checked when the hook runs; a missing option fails the hook before any
//! network I/O.

use std::fmt;
use std::path::PathBuf;

use fwpush_config::ProjectConfig;
use tracing::info;

use crate::credentials::Credentials;
use crate::upload::{UploadError, UploadOutcome, UploadRequest, Uploader};

/// Option key for the device address.
pub const UPLOAD_PORT: &str = "upload_port";
/// Option key for the basic-auth username.
pub const UPLOAD_USER: &str = "custom_upload_user";
/// Option key for the basic-auth password.
pub const UPLOAD_PASSWORD: &str = "custom_upload_password";

/// Errors that fail the post-build hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("missing project option `{0}`")]
    MissingOption(&'static str),

    #[error("firmware image not found at '{}' (did the build produce it?)", .0.display())]
    FirmwareMissing(PathBuf),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// What the build tool knows about the artifact it just produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostBuildContext {
    pub build_dir: PathBuf,
    pub program_name: String,
}

impl PostBuildContext {
    pub fn new(build_dir: impl Into<PathBuf>, program_name: impl Into<String>) -> Self {
        Self {
            build_dir: build_dir.into(),
            program_name: program_name.into(),
        }
    }

    /// `<build_dir>/<program_name>.bin`
    pub fn firmware_path(&self) -> PathBuf {
        self.build_dir.join(format!("{}.bin", self.program_name))
    }
}

/// Project options consumed by the hook.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    pub upload_port: Option<String>,
    pub custom_upload_user: Option<String>,
    pub custom_upload_password: Option<String>,
}

impl ProjectOptions {
    /// A present, non-blank option, returned as written.
    fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, HookError> {
        match value.as_deref() {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(HookError::MissingOption(key)),
        }
    }

    /// Check that every option is present and non-empty.
    pub fn validate(&self) -> Result<(), HookError> {
        Self::required(&self.upload_port, UPLOAD_PORT)?;
        Self::required(&self.custom_upload_user, UPLOAD_USER)?;
        Self::required(&self.custom_upload_password, UPLOAD_PASSWORD)?;
        Ok(())
    }
}

impl From<&ProjectConfig> for ProjectOptions {
    fn from(config: &ProjectConfig) -> Self {
        Self {
            upload_port: config.upload_port.clone(),
            custom_upload_user: config.custom_upload_user.clone(),
            custom_upload_password: config.upload_password(),
        }
    }
}

impl fmt::Debug for ProjectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectOptions")
            .field("upload_port", &self.upload_port)
            .field("custom_upload_user", &self.custom_upload_user)
            .field(
                "custom_upload_password",
                &self.custom_upload_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Turn the build context and options into an upload request.
///
/// Options are checked first, then the firmware image's existence. The
/// address is trimmed; credentials are passed through byte for byte.
pub fn prepare(
    ctx: &PostBuildContext,
    options: &ProjectOptions,
) -> Result<UploadRequest, HookError> {
    let target = ProjectOptions::required(&options.upload_port, UPLOAD_PORT)?.trim();
    let username = ProjectOptions::required(&options.custom_upload_user, UPLOAD_USER)?;
    let password = ProjectOptions::required(&options.custom_upload_password, UPLOAD_PASSWORD)?;

    let firmware = ctx.firmware_path();
    if !firmware.is_file() {
        return Err(HookError::FirmwareMissing(firmware));
    }

    Ok(UploadRequest::new(
        target,
        Credentials::new(username, password),
        firmware,
    ))
}

/// Run the hook: one upload attempt of `<build_dir>/<program_name>.bin`.
pub async fn on_post_build(
    ctx: &PostBuildContext,
    options: &ProjectOptions,
    uploader: &Uploader,
) -> Result<UploadOutcome, HookError> {
    let request = prepare(ctx, options)?;
    deliver(&request, uploader).await
}

/// Upload a request built by [`prepare`].
pub async fn deliver(
    request: &UploadRequest,
    uploader: &Uploader,
) -> Result<UploadOutcome, HookError> {
    info!(
        device = request.target(),
        firmware = %request.firmware().display(),
        "Post-build upload"
    );
    Ok(uploader.upload(request).await?)
}

/// Exit status the build tool sees for a hook run.
pub fn hook_exit_code(result: &Result<UploadOutcome, HookError>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => 1,
    }
}
