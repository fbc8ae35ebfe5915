//! Aggregation units: stateful second-phase merge strategies, one per
//! aggregate function kind.

mod sum;
mod unit;

pub use unit::AggregationUnit;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Aggregate function kind, as reported by the SQL front end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationType {
    Max,
    Min,
    Sum,
    Count,
    Avg,
    BitXor,
    GroupConcat,
    BitAnd,
    BitOr,
    StddevPop,
    StddevSamp,
    VarPop,
    VarSamp,
    /// Any other function name, uppercased.
    Other(String),
}

impl AggregationType {
    /// Parse a function name, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "MAX" => AggregationType::Max,
            "MIN" => AggregationType::Min,
            "SUM" => AggregationType::Sum,
            "COUNT" => AggregationType::Count,
            "AVG" => AggregationType::Avg,
            "BIT_XOR" => AggregationType::BitXor,
            "GROUP_CONCAT" => AggregationType::GroupConcat,
            "BIT_AND" => AggregationType::BitAnd,
            "BIT_OR" => AggregationType::BitOr,
            "STDDEV" | "STDDEV_POP" => AggregationType::StddevPop,
            "STDDEV_SAMP" => AggregationType::StddevSamp,
            "VARIANCE" | "VAR_POP" => AggregationType::VarPop,
            "VAR_SAMP" => AggregationType::VarSamp,
            other => AggregationType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AggregationType::Max => "MAX",
            AggregationType::Min => "MIN",
            AggregationType::Sum => "SUM",
            AggregationType::Count => "COUNT",
            AggregationType::Avg => "AVG",
            AggregationType::BitXor => "BIT_XOR",
            AggregationType::GroupConcat => "GROUP_CONCAT",
            AggregationType::BitAnd => "BIT_AND",
            AggregationType::BitOr => "BIT_OR",
            AggregationType::StddevPop => "STDDEV_POP",
            AggregationType::StddevSamp => "STDDEV_SAMP",
            AggregationType::VarPop => "VAR_POP",
            AggregationType::VarSamp => "VAR_SAMP",
            AggregationType::Other(name) => name,
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
