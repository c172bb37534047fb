//! Device credentials for HTTP Basic authentication.
//!
//! The password is zeroized on drop and redacted in `Debug` output, so an
//! [`UploadRequest`](crate::upload::UploadRequest) can be logged with `?`
//! without leaking it.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Username and password for the device's firmware endpoint.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the password.
    ///
    /// Only the HTTP client should need this.
    pub fn expose_password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_accessors() {
        let creds = Credentials::new("ota", "p@ss:word");
        assert_eq!(creds.username(), "ota");
        assert_eq!(creds.expose_password(), "p@ss:word");
    }

    #[test]
    fn test_zeroize_clears_values() {
        let mut creds = Credentials::new("admin", "hunter2");
        creds.zeroize();
        assert!(creds.username().is_empty());
        assert!(creds.expose_password().is_empty());
    }
}
