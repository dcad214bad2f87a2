//! Admin credentials and API keys loaded from an INI file.
//!
//! ```ini
//! [auth]
//! username = admin
//! password = secret
//!
//! [api_keys]
//! frontend = 3f9c...
//! ```

use std::collections::HashSet;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use ini::Ini;

const AUTH_SECTION: &str = "auth";
const API_KEYS_SECTION: &str = "api_keys";

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("Failed to read credentials file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Credentials file is missing [{0}]")]
    MissingSection(&'static str),

    #[error("Credentials file has no non-empty `{0}` in [auth]")]
    MissingKey(&'static str),
}

/// Read-only credential state, built once at startup.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    api_keys: HashSet<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_keys", &self.api_keys.len())
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        api_keys: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            api_keys: api_keys.into_iter().collect(),
        }
    }

    /// Load credentials from an INI file on disk.
    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        let ini = Ini::load_from_file(path).map_err(|e| CredentialsError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Build credentials from already parsed INI content.
    pub fn from_ini(ini: &Ini) -> Result<Self, CredentialsError> {
        let auth = ini
            .section(Some(AUTH_SECTION))
            .ok_or(CredentialsError::MissingSection(AUTH_SECTION))?;

        let field = |key: &'static str| {
            auth.get(key)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .ok_or(CredentialsError::MissingKey(key))
        };
        let username = field("username")?;
        let password = field("password")?;

        let api_keys = ini
            .section(Some(API_KEYS_SECTION))
            .map(|section| {
                section
                    .iter()
                    .map(|(_, key)| key.to_owned())
                    .filter(|key| !key.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            username,
            password,
            api_keys,
        })
    }

    /// Check an `Authorization: Basic <base64(user:pass)>` header value.
    pub fn check_basic_auth(&self, header: &str) -> bool {
        let Some(encoded) = header.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = BASE64.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        decoded
            .split_once(':')
            .is_some_and(|(user, pass)| user == self.username && pass == self.password)
    }

    /// Whether `key` is one of the configured API keys.
    pub fn check_api_key(&self, key: &str) -> bool {
        self.api_keys.contains(key)
    }

    pub fn api_key_count(&self) -> usize {
        self.api_keys.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[auth]
username = admin
password = s3cr:et

[api_keys]
frontend = key-one
tools = key-two
";

    fn basic(user_pass: &str) -> String {
        format!("Basic {}", BASE64.encode(user_pass))
    }

    fn sample() -> Credentials {
        Credentials::from_ini(&Ini::load_from_str(SAMPLE).unwrap()).unwrap()
    }

    #[test]
    fn parses_auth_and_api_keys() {
        let creds = sample();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "s3cr:et");
        assert_eq!(creds.api_key_count(), 2);
    }

    #[test]
    fn basic_auth_accepts_exact_match() {
        let creds = sample();
        // Only the first colon separates user from password.
        assert!(creds.check_basic_auth(&basic("admin:s3cr:et")));
    }

    #[test]
    fn basic_auth_rejects_mismatches() {
        let creds = sample();
        assert!(!creds.check_basic_auth(&basic("admin:wrong")));
        assert!(!creds.check_basic_auth(&basic("Admin:s3cr:et")));
        assert!(!creds.check_basic_auth(&basic("admins3cr:et")));
        assert!(!creds.check_basic_auth(&basic(":")));
    }

    #[test]
    fn basic_auth_rejects_malformed_headers() {
        let creds = sample();
        assert!(!creds.check_basic_auth(""));
        assert!(!creds.check_basic_auth("Bearer abc"));
        assert!(!creds.check_basic_auth("Basic !!!not-base64!!!"));
        assert!(!creds.check_basic_auth(&format!("Basic {}", BASE64.encode([0xff, 0xfe]))));
    }

    #[test]
    fn api_keys_are_matched_by_value() {
        let creds = sample();
        assert!(creds.check_api_key("key-one"));
        assert!(creds.check_api_key("key-two"));
        assert!(!creds.check_api_key("frontend"));
        assert!(!creds.check_api_key(""));
    }

    #[test]
    fn api_keys_section_is_optional() {
        let ini = Ini::load_from_str("[auth]\nusername = a\npassword = b\n").unwrap();
        let creds = Credentials::from_ini(&ini).unwrap();
        assert_eq!(creds.api_key_count(), 0);
    }

    #[test]
    fn missing_auth_section_is_an_error() {
        let ini = Ini::load_from_str("[api_keys]\nk = v\n").unwrap();
        assert!(matches!(
            Credentials::from_ini(&ini),
            Err(CredentialsError::MissingSection("auth"))
        ));
    }

    #[test]
    fn empty_password_is_an_error() {
        let ini = Ini::load_from_str("[auth]\nusername = a\npassword =\n").unwrap();
        assert!(matches!(
            Credentials::from_ini(&ini),
            Err(CredentialsError::MissingKey("password"))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, SAMPLE).unwrap();

        let creds = Credentials::load(&path).unwrap();
        assert!(creds.check_basic_auth(&basic("admin:s3cr:et")));
    }

    #[test]
    fn load_missing_file_fails() {
        let err = Credentials::load(Path::new("/nonexistent/config.ini")).unwrap_err();
        assert!(matches!(err, CredentialsError::Read { .. }));
    }
}
