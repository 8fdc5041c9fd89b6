//! Embedding inputs and outputs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AcousticError;

/// Projection strategy
///
/// Serialized as `nmds` / `umap`; parsed from any name `FromStr` accepts, so
/// the HTTP body and the CLI take the same spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum EmbeddingStrategy {
    /// Non-metric MDS on the cosine-distance matrix
    #[serde(rename = "nmds")]
    MetricMds,
    /// Neighbor-graph embedding on z-scored vectors
    #[serde(rename = "umap")]
    GraphEmbedding,
}

impl EmbeddingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingStrategy::MetricMds => "nmds",
            EmbeddingStrategy::GraphEmbedding => "umap",
        }
    }
}

impl fmt::Display for EmbeddingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingStrategy {
    type Err = AcousticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nmds" | "mds" | "metric-mds" => Ok(EmbeddingStrategy::MetricMds),
            "umap" | "graph" | "graph-embedding" => Ok(EmbeddingStrategy::GraphEmbedding),
            other => Err(AcousticError::InvalidInput(format!(
                "Unknown embedding strategy '{}' (expected nmds or umap)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for EmbeddingStrategy {
    type Error = AcousticError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// An assembled vector tagged for display
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledVector {
    pub entity_id: String,
    pub label: String,
    pub vector: Vec<f64>,
}

/// One projected point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub entity_id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("NMDS".parse::<EmbeddingStrategy>().unwrap(), EmbeddingStrategy::MetricMds);
        assert_eq!(
            "graph-embedding".parse::<EmbeddingStrategy>().unwrap(),
            EmbeddingStrategy::GraphEmbedding
        );
        assert!("tsne".parse::<EmbeddingStrategy>().is_err());
    }

    #[test]
    fn test_strategy_wire_names() {
        let json = serde_json::to_string(&EmbeddingStrategy::GraphEmbedding).unwrap();
        assert_eq!(json, "\"umap\"");
    }

    #[test]
    fn test_json_accepts_every_cli_spelling() {
        for (name, expected) in [
            ("nmds", EmbeddingStrategy::MetricMds),
            ("metric-MDS", EmbeddingStrategy::MetricMds),
            ("graph-embedding", EmbeddingStrategy::GraphEmbedding),
            ("UMAP", EmbeddingStrategy::GraphEmbedding),
        ] {
            let parsed: EmbeddingStrategy = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(parsed, expected, "{}", name);
        }

        let err = serde_json::from_str::<EmbeddingStrategy>("\"tsne\"").unwrap_err();
        assert!(err.to_string().contains("tsne"));
    }
}
