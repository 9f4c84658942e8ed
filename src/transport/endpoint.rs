use std::fmt;

use url::Url;

use crate::utils::error::ChannelError;

/// The realtime endpoint, without credentials.
///
/// Built once from the configured origin; `url_for` adds the bearer token
/// for a single connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    /// `origin` may use `http`/`ws` (mapped to `ws`) or `https`/`wss`
    /// (mapped to `wss`). Any path, query or fragment on it is replaced.
    pub fn parse(origin: &str, path: &str) -> Result<Self, ChannelError> {
        let mut base = Url::parse(origin)?;
        let scheme = match base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ChannelError::UnsupportedScheme(other.to_string())),
        };
        base.set_scheme(scheme)
            .map_err(|()| ChannelError::UnsupportedScheme(scheme.to_string()))?;

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        base.set_path(&path);
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self { base })
    }

    pub fn url_for(&self, token: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("token", token);
        url
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt(f)
    }
}
