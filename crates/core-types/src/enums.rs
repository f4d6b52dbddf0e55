use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an inbound query came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    ExternalAssistant,
    MessagingBot,
    TestHarness,
    #[default]
    DirectApi,
}

impl QuerySource {
    pub const ALL: [QuerySource; 4] = [
        QuerySource::ExternalAssistant,
        QuerySource::MessagingBot,
        QuerySource::TestHarness,
        QuerySource::DirectApi,
    ];

    /// The identifier used in storage, cache keys and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuerySource::ExternalAssistant => "external_assistant",
            QuerySource::MessagingBot => "messaging_bot",
            QuerySource::TestHarness => "test_harness",
            QuerySource::DirectApi => "direct_api",
        }
    }
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuerySource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuerySource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| ValidationError::new("source", format!("unknown query source '{s}'")))
    }
}

/// What kind of request a query was.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Signal,
    Analysis,
    Chart,
    #[default]
    Other,
}

impl QueryCategory {
    pub const ALL: [QueryCategory; 4] = [
        QueryCategory::Signal,
        QueryCategory::Analysis,
        QueryCategory::Chart,
        QueryCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::Signal => "signal",
            QueryCategory::Analysis => "analysis",
            QueryCategory::Chart => "chart",
            QueryCategory::Other => "other",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ValidationError::new("category", format!("unknown query category '{s}'")))
    }
}
