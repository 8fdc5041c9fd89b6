//! Visualization export
//!
//! Writes projected points to a single self-contained HTML document: an
//! inline SVG scatter plot with hover labels, plus the raw points embedded
//! as JSON for downstream tooling.

use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{EmbeddingStrategy, ProjectedPoint};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const MARGIN: f64 = 48.0;
const POINT_RADIUS: f64 = 6.0;

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize points: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write document: {0}")]
    Io(#[from] std::io::Error),
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Stable hue in `[0, 360)` for an entity id (FNV-1a)
pub fn entity_hue(entity_id: &str) -> u32 {
    let hash = entity_id
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
        });
    (hash % 360) as u32
}

/// Linear map of data coordinates into the plot area
struct Scale {
    min: f64,
    span: f64,
    out_min: f64,
    out_span: f64,
}

impl Scale {
    fn new(values: impl Iterator<Item = f64> + Clone, out_min: f64, out_max: f64) -> Self {
        let min = values.clone().fold(f64::INFINITY, f64::min);
        let max = values.fold(f64::NEG_INFINITY, f64::max);
        Self {
            min,
            span: max - min,
            out_min,
            out_span: out_max - out_min,
        }
    }

    fn apply(&self, value: f64) -> f64 {
        if self.span > 0.0 && self.span.is_finite() {
            self.out_min + (value - self.min) / self.span * self.out_span
        } else {
            self.out_min + self.out_span / 2.0
        }
    }
}

/// Render the complete HTML document
pub fn render_document(
    strategy: EmbeddingStrategy,
    points: &[ProjectedPoint],
) -> Result<String, ExportError> {
    let title = match strategy {
        EmbeddingStrategy::MetricMds => "Bird calls: non-metric MDS of cosine distances",
        EmbeddingStrategy::GraphEmbedding => "Bird calls: neighbor-graph embedding",
    };

    let x_scale = Scale::new(points.iter().map(|p| p.x), MARGIN, WIDTH - MARGIN);
    // SVG y grows downward
    let y_scale = Scale::new(points.iter().map(|p| p.y), HEIGHT - MARGIN, MARGIN);

    let mut circles = String::new();
    for point in points {
        let label = escape_html(&point.label);
        circles.push_str(&format!(
            r#"    <circle cx="{:.2}" cy="{:.2}" r="{}" fill="hsl({}, 65%, 50%)" data-entity="{}"><title>{} ({})</title></circle>"#,
            x_scale.apply(point.x),
            y_scale.apply(point.y),
            POINT_RADIUS,
            entity_hue(&point.entity_id),
            escape_html(&point.entity_id),
            label,
            escape_html(&point.entity_id),
        ));
        circles.push('\n');
    }

    // No raw '<' inside the script element
    let data = serde_json::to_string(points)?.replace('<', "\\u003c");
    let axis = strategy.as_str().to_uppercase();

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body {{ font-family: sans-serif; margin: 2rem; }}
  circle {{ stroke: #333; stroke-width: 0.5; opacity: 0.85; }}
  circle:hover {{ stroke-width: 2; opacity: 1; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p>{count} recordings, generated {generated}</p>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}">
  <rect x="0" y="0" width="{width}" height="{height}" fill="white" stroke="#ccc"/>
  <text x="{x_label_x}" y="{x_label_y}" text-anchor="middle">{axis} 1</text>
  <text x="16" y="{y_label_y}" text-anchor="middle" transform="rotate(-90 16 {y_label_y})">{axis} 2</text>
{circles}</svg>
<script type="application/json" id="points">{data}</script>
</body>
</html>
"##,
        title = escape_html(title),
        count = points.len(),
        generated = Utc::now().to_rfc3339(),
        width = WIDTH,
        height = HEIGHT,
        x_label_x = WIDTH / 2.0,
        x_label_y = HEIGHT - 12.0,
        y_label_y = HEIGHT / 2.0,
        axis = axis,
        circles = circles,
        data = data,
    ))
}

/// Write the document to `<exports_dir>/<strategy>_<timestamp>.html`
pub async fn export_document(
    exports_dir: &Path,
    strategy: EmbeddingStrategy,
    points: &[ProjectedPoint],
) -> Result<PathBuf, ExportError> {
    let html = render_document(strategy, points)?;

    tokio::fs::create_dir_all(exports_dir).await?;
    let file_name = format!(
        "{}_{}.html",
        strategy.as_str(),
        Utc::now().format("%Y%m%dT%H%M%S%3fZ")
    );
    let path = exports_dir.join(file_name);
    tokio::fs::write(&path, html).await?;

    tracing::info!(path = %path.display(), points = points.len(), "Visualization exported");
    Ok(path)
}
