use std::{fmt, str::FromStr};

use url::Url;

use crate::common::data::Error;

// Relative references are resolved against this base only to validate them.
const RELATIVE_BASE: &str = "http://relative.invalid";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Components {
    Opaque {
        scheme: String,
        scheme_specific_part: String,
    },
    Hierarchical {
        scheme: Option<String>,
        user_info: Option<String>,
        host: Option<String>,
        port: Option<u16>,
        path: String,
        query: Option<String>,
    },
}

/// A dispatched or expected request target.
///
/// Absolute URIs (`http://example.com/a?b`) and relative references (`/a?b`) are both
/// accepted. URIs whose scheme-specific part does not begin with a slash
/// (`mailto:someone@example.com`) are treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUri {
    raw: String,
    components: Components,
}

impl RequestUri {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.components, Components::Opaque { .. })
    }

    pub fn scheme(&self) -> Option<&str> {
        match &self.components {
            Components::Opaque { scheme, .. } => Some(scheme),
            Components::Hierarchical { scheme, .. } => scheme.as_deref(),
        }
    }

    pub fn host(&self) -> Option<&str> {
        match &self.components {
            Components::Opaque { .. } => None,
            Components::Hierarchical { host, .. } => host.as_deref(),
        }
    }

    pub fn port(&self) -> Option<u16> {
        match &self.components {
            Components::Opaque { .. } => None,
            Components::Hierarchical { port, .. } => *port,
        }
    }

    pub fn user_info(&self) -> Option<&str> {
        match &self.components {
            Components::Opaque { .. } => None,
            Components::Hierarchical { user_info, .. } => user_info.as_deref(),
        }
    }

    /// The path component. Opaque URIs have an empty path.
    pub fn path(&self) -> &str {
        match &self.components {
            Components::Opaque { .. } => "",
            Components::Hierarchical { path, .. } => path,
        }
    }

    pub fn query(&self) -> Option<&str> {
        match &self.components {
            Components::Opaque { .. } => None,
            Components::Hierarchical { query, .. } => query.as_deref(),
        }
    }

    /// Compares two URIs component by component, ignoring any query string.
    ///
    /// Opaque URIs only ever equal other opaque URIs with the same scheme-specific part.
    pub fn equals_ignoring_query(&self, other: &RequestUri) -> bool {
        match (&self.components, &other.components) {
            (
                Components::Opaque {
                    scheme_specific_part: left,
                    ..
                },
                Components::Opaque {
                    scheme_specific_part: right,
                    ..
                },
            ) => left == right,
            (
                Components::Hierarchical {
                    scheme: s1,
                    user_info: u1,
                    host: h1,
                    port: p1,
                    path: path1,
                    ..
                },
                Components::Hierarchical {
                    scheme: s2,
                    user_info: u2,
                    host: h2,
                    port: p2,
                    path: path2,
                    ..
                },
            ) => s1 == s2 && u1 == u2 && h1 == h2 && p1 == p2 && path1 == path2,
            _ => false,
        }
    }
}

impl FromStr for RequestUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)?;

        Ok(Self {
            raw: s.to_string(),
            components: split_components(s),
        })
    }
}

impl TryFrom<&str> for RequestUri {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for RequestUri {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RequestUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// `url` rejects malformed authorities and ports. Its normalised output is discarded.
fn validate(s: &str) -> Result<(), Error> {
    match Url::parse(s) {
        Ok(_) => Ok(()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(RELATIVE_BASE).map_err(|err| Error::InvalidUri(err.to_string()))?;
            base.join(s)
                .map(|_| ())
                .map_err(|err| Error::InvalidUri(format!("{}: {}", s, err)))
        }
        Err(err) => Err(Error::InvalidUri(format!("{}: {}", s, err))),
    }
}

/// Splits `s` into its generic URI components without decoding or normalising anything.
fn split_components(s: &str) -> Components {
    let without_fragment = s.split_once('#').map_or(s, |(head, _)| head);
    let (scheme, rest) = split_scheme(without_fragment);

    if let Some(scheme) = scheme {
        if !rest.starts_with('/') {
            return Components::Opaque {
                scheme: scheme.to_string(),
                scheme_specific_part: rest.to_string(),
            };
        }
    }

    let (authority, rest) = match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find(['/', '?']).unwrap_or(after.len());
            (Some(&after[..end]), &after[end..])
        }
        None => (None, rest),
    };

    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let (user_info, host, port) = authority.map(split_authority).unwrap_or_default();

    Components::Hierarchical {
        scheme: scheme.map(str::to_string),
        user_info,
        host,
        port,
        path: path.to_string(),
        query: query.map(str::to_string),
    }
}

fn split_scheme(s: &str) -> (Option<&str>, &str) {
    match s.find([':', '/', '?']) {
        Some(idx) if s[idx..].starts_with(':') && is_scheme(&s[..idx]) => (Some(&s[..idx]), &s[idx + 1..]),
        _ => (None, s),
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn split_authority(authority: &str) -> (Option<String>, Option<String>, Option<u16>) {
    let (user_info, host_port) = match authority.rsplit_once('@') {
        Some((user_info, host_port)) => (Some(user_info.to_string()), host_port),
        None => (None, authority),
    };

    // Bracketed IPv6 literals contain colons of their own.
    let port_separator = match host_port.rfind(']') {
        Some(close) => host_port[close..].find(':').map(|idx| close + idx),
        None => host_port.rfind(':'),
    };

    let (host, port) = match port_separator {
        Some(idx) => (&host_port[..idx], host_port[idx + 1..].parse().ok()),
        None => (host_port, None),
    };

    let host = if host.is_empty() { None } else { Some(host.to_string()) };
    (user_info, host, port)
}
