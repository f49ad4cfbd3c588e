use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity namespaces, each with its own external-key space and backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Pages,
    Files,
    Parameters,
    Projects,
    Uris,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Pages,
        Namespace::Files,
        Namespace::Parameters,
        Namespace::Projects,
        Namespace::Uris,
    ];

    /// Stable label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Pages => "pages",
            Namespace::Files => "files",
            Namespace::Parameters => "parameters",
            Namespace::Projects => "projects",
            Namespace::Uris => "uris",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a URI record points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UriResourceType {
    Page,
    File,
}
