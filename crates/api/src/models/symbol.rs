use super::graph::Relation;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-based source span. Columns are byte offsets into the line, the way the
/// parser reports them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, JsonSchema)]
pub struct Range {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Range {
    pub fn contains(&self, line: usize, col: usize) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && col < self.start_col {
            return false;
        }
        if line == self.end_line && col > self.end_col {
            return false;
        }
        true
    }
}

/// The cross-language vocabulary of unresolved references an analyzer records.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    BaseClass,
    ImplementInterface,
    ExtendInterface,
    Call,
    Parameters,
    ReturnType,
    Import,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 7] = [
        SymbolKind::BaseClass,
        SymbolKind::ImplementInterface,
        SymbolKind::ExtendInterface,
        SymbolKind::Call,
        SymbolKind::Parameters,
        SymbolKind::ReturnType,
        SymbolKind::Import,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::BaseClass => "base_class",
            SymbolKind::ImplementInterface => "implement_interface",
            SymbolKind::ExtendInterface => "extend_interface",
            SymbolKind::Call => "call",
            SymbolKind::Parameters => "parameters",
            SymbolKind::ReturnType => "return_type",
            SymbolKind::Import => "import",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Edge emitted for a resolved symbol of this kind.
    pub fn relation(&self) -> Relation {
        match self {
            SymbolKind::BaseClass | SymbolKind::ExtendInterface => Relation::Extends,
            SymbolKind::ImplementInterface => Relation::Implements,
            SymbolKind::Call => Relation::Calls,
            SymbolKind::Parameters => Relation::Parameters,
            SymbolKind::ReturnType => Relation::Returns,
            SymbolKind::Import => Relation::Imports,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
