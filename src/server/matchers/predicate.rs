use std::{fmt, sync::Arc};

use regex::Regex;

/// A test over a single string value (a URI, a header value or a request body).
///
/// Closures and regular expressions share this one representation, so every check that
/// accepts a predicate behaves identically no matter how the predicate was written.
#[derive(Clone)]
pub struct StringPredicate {
    test: Arc<dyn Fn(&str) -> bool + Send + Sync>,
    description: Option<String>,
}

impl StringPredicate {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Arc::new(test),
            description: None,
        }
    }

    /// A predicate that is satisfied when `regex` finds a match anywhere in the value.
    pub fn regex(regex: Regex) -> Self {
        let description = format!("matching {}", regex);
        Self {
            test: Arc::new(move |value| regex.is_match(value)),
            description: Some(description),
        }
    }

    /// Attaches a human readable description that is used in failure messages.
    pub fn describe<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn test(&self, value: &str) -> bool {
        (self.test)(value)
    }
}

impl fmt::Debug for StringPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringPredicate")
            .field("description", &self.description)
            .finish()
    }
}

impl fmt::Display for StringPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description.as_deref().unwrap_or("<predicate>"))
    }
}
