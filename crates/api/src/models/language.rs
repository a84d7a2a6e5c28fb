use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Programming language identifier, shared by analyzers, config and the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Language(#[schemars(with = "String")] Cow<'static, str>);

impl Language {
    pub const JAVA: Language = Language(Cow::Borrowed("java"));
    pub const KOTLIN: Language = Language(Cow::Borrowed("kotlin"));
    pub const JAVASCRIPT: Language = Language(Cow::Borrowed("javascript"));
    pub const PYTHON: Language = Language(Cow::Borrowed("python"));
    pub const CSHARP: Language = Language(Cow::Borrowed("csharp"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Language {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
