use std::{borrow::Cow, fmt, str::FromStr};

const WILDCARD: &str = "*";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("media type must not be empty")]
    Empty,
    #[error("media type '{0}' does not contain '/'")]
    MissingSubtype(String),
    #[error("media type '{0}' has an empty type or subtype")]
    EmptyToken(String),
    #[error("media type '{0}' contains an illegal character")]
    IllegalCharacter(String),
    #[error("wildcard type is legal only in '*/*' (all media types), got '{0}'")]
    WildcardType(String),
    #[error("invalid media type parameter '{0}'")]
    InvalidParameter(String),
}

/// A parsed media type such as `application/json;charset=UTF-8`.
///
/// Type, subtype and parameter names are compared case-insensitively (they are
/// normalised to lower case when parsed). Parameter values are compared verbatim,
/// except for `charset`, which is case-insensitive.
#[derive(Debug, Clone)]
pub struct MediaType {
    main_type: Cow<'static, str>,
    sub_type: Cow<'static, str>,
    params: Vec<(String, String)>,
}

impl MediaType {
    pub const ALL: MediaType = MediaType::from_static(WILDCARD, WILDCARD);
    pub const APPLICATION_JSON: MediaType = MediaType::from_static("application", "json");
    pub const APPLICATION_XML: MediaType = MediaType::from_static("application", "xml");
    pub const APPLICATION_OCTET_STREAM: MediaType =
        MediaType::from_static("application", "octet-stream");
    pub const APPLICATION_FORM_URLENCODED: MediaType =
        MediaType::from_static("application", "x-www-form-urlencoded");
    pub const TEXT_PLAIN: MediaType = MediaType::from_static("text", "plain");
    pub const TEXT_HTML: MediaType = MediaType::from_static("text", "html");
    pub const IMAGE_JPEG: MediaType = MediaType::from_static("image", "jpeg");

    const fn from_static(main_type: &'static str, sub_type: &'static str) -> Self {
        Self {
            main_type: Cow::Borrowed(main_type),
            sub_type: Cow::Borrowed(sub_type),
            params: Vec::new(),
        }
    }

    /// Parses a header value. Equivalent to `value.parse::<MediaType>()`.
    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        value.parse()
    }

    /// Returns a copy of this media type with the given parameter added (or replaced).
    pub fn with_param<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        let name = name.into().to_ascii_lowercase();
        self.params.retain(|(n, _)| *n != name);
        self.params.push((name, value.into()));
        self
    }

    pub fn main_type(&self) -> &str {
        &self.main_type
    }

    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    pub fn is_wildcard_type(&self) -> bool {
        self.main_type == WILDCARD
    }

    /// `*` as well as suffix wildcards like `*+json`.
    pub fn is_wildcard_subtype(&self) -> bool {
        self.sub_type == WILDCARD || self.sub_type.starts_with("*+")
    }

    /// The structured syntax suffix, e.g. `json` for `application/vnd.api+json`.
    pub fn subtype_suffix(&self) -> Option<&str> {
        self.sub_type.rsplit_once('+').map(|(_, suffix)| suffix)
    }

    /// Whether this media type (the candidate) is compatible with `expected`.
    ///
    /// Types and subtypes must be equal unless either side uses a wildcard. Every parameter
    /// declared on `expected` must be present with an equal value on this media type;
    /// additional parameters on this media type are ignored.
    pub fn is_compatible_with(&self, expected: &MediaType) -> bool {
        self.type_compatible(expected) && self.includes_params_of(expected)
    }

    fn type_compatible(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }

        if self.main_type != other.main_type {
            return false;
        }

        if self.sub_type == other.sub_type {
            return true;
        }

        if self.is_wildcard_subtype() || other.is_wildcard_subtype() {
            return match (self.subtype_suffix(), other.subtype_suffix()) {
                (Some(s1), Some(s2)) => s1 == s2,
                // A suffix wildcard like "*+json" also accepts the bare suffix type.
                _ => {
                    self.sub_type == WILDCARD
                        || other.sub_type == WILDCARD
                        || self.sub_type.strip_prefix("*+") == Some(other.sub_type.as_ref())
                        || other.sub_type.strip_prefix("*+") == Some(self.sub_type.as_ref())
                }
            };
        }

        false
    }

    fn includes_params_of(&self, expected: &MediaType) -> bool {
        expected
            .params
            .iter()
            .all(|(name, value)| match self.param(name) {
                Some(actual) => param_value_eq(name, actual, value),
                None => false,
            })
    }
}

fn param_value_eq(name: &str, left: &str, right: &str) -> bool {
    if name == "charset" {
        return left.eq_ignore_ascii_case(right);
    }
    left == right
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        self.main_type == other.main_type
            && self.sub_type == other.sub_type
            && self.params.len() == other.params.len()
            && self.includes_params_of(other)
    }
}

impl Eq for MediaType {}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(MediaTypeError::Empty);
        }

        let mut segments = split_params(value).into_iter();
        let full_type = segments.next().unwrap_or_default().trim();

        // Some clients send a bare "*" to mean "*/*".
        let full_type = if full_type == WILDCARD { "*/*" } else { full_type };

        let (main_type, sub_type) = full_type
            .split_once('/')
            .ok_or_else(|| MediaTypeError::MissingSubtype(value.to_string()))?;
        let (main_type, sub_type) = (main_type.trim(), sub_type.trim());

        if main_type.is_empty() || sub_type.is_empty() {
            return Err(MediaTypeError::EmptyToken(value.to_string()));
        }
        if !is_token(main_type) || !is_token(sub_type) {
            return Err(MediaTypeError::IllegalCharacter(value.to_string()));
        }
        if main_type == WILDCARD && sub_type != WILDCARD {
            return Err(MediaTypeError::WildcardType(value.to_string()));
        }

        let mut params = Vec::new();
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (name, raw_value) = segment
                .split_once('=')
                .ok_or_else(|| MediaTypeError::InvalidParameter(segment.to_string()))?;
            let (name, raw_value) = (name.trim(), raw_value.trim());

            if name.is_empty() || !is_token(name) {
                return Err(MediaTypeError::InvalidParameter(segment.to_string()));
            }

            let param_value = unquote(raw_value)
                .ok_or_else(|| MediaTypeError::InvalidParameter(segment.to_string()))?;

            params.push((name.to_ascii_lowercase(), param_value));
        }

        Ok(Self {
            main_type: Cow::Owned(main_type.to_ascii_lowercase()),
            sub_type: Cow::Owned(sub_type.to_ascii_lowercase()),
            params,
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (name, value) in &self.params {
            if is_token(value) {
                write!(f, ";{}={}", name, value)?;
            } else {
                write!(f, ";{}=\"{}\"", name, value.replace('"', "\\\""))?;
            }
        }
        Ok(())
    }
}

/// Anything that can be turned into a [MediaType] when declaring an expectation.
pub trait IntoMediaType {
    fn into_media_type(self) -> Result<MediaType, MediaTypeError>;
}

impl IntoMediaType for MediaType {
    fn into_media_type(self) -> Result<MediaType, MediaTypeError> {
        Ok(self)
    }
}

impl IntoMediaType for &MediaType {
    fn into_media_type(self) -> Result<MediaType, MediaTypeError> {
        Ok(self.clone())
    }
}

impl IntoMediaType for &str {
    fn into_media_type(self) -> Result<MediaType, MediaTypeError> {
        self.parse()
    }
}

impl IntoMediaType for String {
    fn into_media_type(self) -> Result<MediaType, MediaTypeError> {
        self.parse()
    }
}

// Splits on ';' outside of quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (idx, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                result.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    result.push(&value[start..]);
    result
}

fn unquote(value: &str) -> Option<String> {
    if let Some(inner) = value.strip_prefix('"') {
        let inner = inner.strip_suffix('"')?;
        return Some(inner.replace("\\\"", "\"").replace("\\\\", "\\"));
    }

    if value.is_empty() || !is_token(value) {
        return None;
    }

    Some(value.to_string())
}

// RFC 7230 "token".
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
        })
}
