use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Outbound proxy for a single job.
///
/// Credentials are kept for the browser engine (which authenticates pages
/// against the proxy) but are never serialized back to clients: the wire form
/// is a redacted `{"server": "http://ip:port"}` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxySpec {
    pub ip: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySpec {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Proxy server string in the form the browser engine expects.
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    /// Username/password pair, if both were supplied.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl Serialize for ProxySpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Redacted on purpose: job records are client-visible.
        let mut s = serializer.serialize_struct("ProxySpec", 1)?;
        s.serialize_field("server", &self.server_url())?;
        s.end()
    }
}

/// Identity under which browser contexts are pooled.
///
/// Derived from `(ip, port, username)`, the parts that determine the exit
/// identity of the connection. Two jobs with the same key must share one
/// context. Jobs without a proxy all map to the `direct` sentinel key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyKey(String);

const DIRECT_KEY: &str = "direct";

impl ProxyKey {
    pub fn direct() -> Self {
        Self(DIRECT_KEY.to_string())
    }

    pub fn from_spec(spec: &ProxySpec) -> Self {
        match &spec.username {
            Some(user) => Self(format!("{}:{}@{}", spec.ip, spec.port, user)),
            None => Self(format!("{}:{}", spec.ip, spec.port)),
        }
    }

    pub fn from_optional(spec: Option<&ProxySpec>) -> Self {
        spec.map(Self::from_spec).unwrap_or_else(Self::direct)
    }

    pub fn is_direct(&self) -> bool {
        self.0 == DIRECT_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_same_for_identical_tuple() {
        let a = ProxySpec::new("10.0.0.1", 8080).with_credentials("user", "pass1");
        let b = ProxySpec::new("10.0.0.1", 8080).with_credentials("user", "pass2");
        // Password is not part of the identity.
        assert_eq!(ProxyKey::from_spec(&a), ProxyKey::from_spec(&b));
    }

    #[test]
    fn test_key_differs_by_user() {
        let a = ProxySpec::new("10.0.0.1", 8080).with_credentials("alice", "x");
        let b = ProxySpec::new("10.0.0.1", 8080).with_credentials("bob", "x");
        assert_ne!(ProxyKey::from_spec(&a), ProxyKey::from_spec(&b));
    }

    #[test]
    fn test_direct_sentinel() {
        let key = ProxyKey::from_optional(None);
        assert!(key.is_direct());
        assert_eq!(key, ProxyKey::direct());
    }

    #[test]
    fn test_serialized_form_redacts_credentials() {
        let spec = ProxySpec::new("10.0.0.1", 8080).with_credentials("user", "secret");
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"server":"http://10.0.0.1:8080"}"#);
        assert!(!json.contains("secret"));
    }
}
