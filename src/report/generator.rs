//! Dashboard rendering.
//!
//! This module turns a `DashboardSummary` into the HTML dashboard page or a
//! JSON document. Chart datasets follow the `ChartSpec` schema and travel to
//! the page as an escaped JSON block, never spliced into script source.

use crate::models::{DashboardSummary, LatencyStats, UsageCount};
use anyhow::{Context, Result};
use serde::Serialize;
use tera::Tera;

/// Page template, compiled into the binary.
const DASHBOARD_TEMPLATE: &str = include_str!("../../templates/dashboard.html");

/// Template name; the `.html` suffix turns on Tera autoescaping.
const TEMPLATE_NAME: &str = "dashboard.html";

/// Chart library loaded by the page.
pub const CHART_JS_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js";

/// RGB colour of a chart's bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartColor(pub u8, pub u8, pub u8);

impl ChartColor {
    const BLUE: ChartColor = ChartColor(54, 162, 235);
    const ORANGE: ChartColor = ChartColor(255, 159, 64);
    const RED: ChartColor = ChartColor(255, 99, 132);

    fn rgba(&self, alpha: f32) -> String {
        format!("rgba({}, {}, {}, {})", self.0, self.1, self.2, alpha)
    }
}

/// One bar chart on the page.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    /// Canvas element id.
    pub id: &'static str,
    /// Heading shown above the chart.
    pub title: &'static str,
    /// Dataset legend.
    pub label: &'static str,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub background_color: String,
    pub border_color: String,
}

impl ChartSpec {
    fn new(
        id: &'static str,
        title: &'static str,
        label: &'static str,
        color: ChartColor,
        points: Vec<(String, f64)>,
    ) -> Self {
        let (labels, values) = points.into_iter().unzip();
        Self {
            id,
            title,
            label,
            labels,
            values,
            background_color: color.rgba(0.6),
            border_color: color.rgba(1.0),
        }
    }
}

/// Latency means as shown on the page: whole milliseconds.
#[derive(Debug, Clone, Copy, Serialize)]
struct LatencyView {
    req_to_rec: i64,
    req_to_show: i64,
    proc_time: i64,
    samples: u64,
}

impl From<&LatencyStats> for LatencyView {
    fn from(stats: &LatencyStats) -> Self {
        Self {
            req_to_rec: stats.avg_req_to_rec.trunc() as i64,
            req_to_show: stats.avg_req_to_show.trunc() as i64,
            proc_time: stats.avg_proc_time.trunc() as i64,
            samples: stats.samples,
        }
    }
}

fn count_points(counts: &[UsageCount]) -> Vec<(String, f64)> {
    counts
        .iter()
        .map(|c| (c.name.clone(), c.count as f64))
        .collect()
}

/// Build the chart datasets for a summary.
pub fn build_charts(summary: &DashboardSummary) -> Vec<ChartSpec> {
    vec![
        ChartSpec::new(
            "featureChart",
            "Which marketplace features are used the most and the least?",
            "Feature Usage",
            ChartColor::BLUE,
            count_points(&summary.feature_usage),
        ),
        ChartSpec::new(
            "timeChart",
            "Where Users Spend the Most Time",
            "Avg Time Spent (sec)",
            ChartColor::ORANGE,
            summary
                .top_sections
                .iter()
                .map(|s| (s.section.clone(), s.avg_seconds))
                .collect(),
        ),
        ChartSpec::new(
            "categoryChart",
            "Which materials/type of materials are being sold the most?",
            "Material Usage",
            ChartColor::RED,
            count_points(&summary.categories),
        ),
    ]
}

/// Serialize to JSON that is safe inside a `<script>` element.
///
/// `<`, `>` and `&` only ever occur inside JSON strings, so replacing them
/// with `\u` escapes keeps the value identical after parsing.
fn script_safe_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

/// Renders the dashboard page.
pub struct DashboardRenderer {
    tera: Tera,
}

impl DashboardRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, DASHBOARD_TEMPLATE)
            .context("Failed to compile dashboard template")?;
        Ok(Self { tera })
    }

    /// Render the complete HTML page.
    pub fn render_html(&self, summary: &DashboardSummary, title: &str) -> Result<String> {
        let charts = build_charts(summary);

        let mut context = tera::Context::new();
        context.insert("title", title);
        context.insert(
            "generated_at",
            &summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        context.insert("chart_js_url", CHART_JS_URL);
        context.insert("latency", &LatencyView::from(&summary.latency));
        context.insert("chart_data", &script_safe_json(&charts)?);
        context.insert("charts", &charts);

        self.tera
            .render(TEMPLATE_NAME, &context)
            .context("Failed to render dashboard")
    }
}

/// Generate a JSON report.
pub fn generate_json_report(summary: &DashboardSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionTime;
    use chrono::Utc;

    fn create_test_summary() -> DashboardSummary {
        DashboardSummary {
            generated_at: Utc::now(),
            feature_usage: vec![
                UsageCount {
                    name: "search_*".to_string(),
                    count: 7,
                },
                UsageCount {
                    name: "map".to_string(),
                    count: 3,
                },
            ],
            latency: LatencyStats {
                samples: 4,
                avg_req_to_rec: 120.9,
                avg_req_to_show: 300.2,
                avg_proc_time: 179.5,
            },
            top_sections: vec![SectionTime {
                section: "cart".to_string(),
                avg_ms: 15250.0,
                avg_seconds: 15.25,
                samples: 2,
            }],
            categories: vec![UsageCount {
                name: "Books".to_string(),
                count: 2,
            }],
        }
    }

    #[test]
    fn test_render_html() {
        let renderer = DashboardRenderer::new().unwrap();
        let html = renderer
            .render_html(&create_test_summary(), "App Analytics Dashboard")
            .unwrap();

        assert!(html.contains("<title>App Analytics Dashboard</title>"));
        assert!(html.contains(CHART_JS_URL));
        assert!(html.contains("Avg Requested to Received:</b> 120 ms"));
        assert!(html.contains("Avg Requested to Showed:</b> 300 ms"));
        assert!(html.contains("Avg Processing Time:</b> 179 ms"));
        assert!(html.contains("id=\"featureChart\""));
        assert!(html.contains("id=\"timeChart\""));
        assert!(html.contains("id=\"categoryChart\""));
        assert!(html.contains("\"search_*\""));
        assert!(html.contains("15.25"));
    }

    #[test]
    fn test_render_escapes_record_values() {
        let mut summary = create_test_summary();
        summary.categories.push(UsageCount {
            name: "</script><script>alert(1)</script>".to_string(),
            count: 1,
        });

        let renderer = DashboardRenderer::new().unwrap();
        let html = renderer.render_html(&summary, "<b>Board</b>").unwrap();

        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("\\u003c/script\\u003e\\u003cscript\\u003ealert(1)"));
        assert!(!html.contains("<b>Board</b>"));
        assert!(html.contains("&lt;b&gt;Board&lt;&#x2F;b&gt;"));
    }

    #[test]
    fn test_script_safe_json_round_trips() {
        let value = vec!["a<b>&c\u{2028}".to_string()];
        let encoded = script_safe_json(&value).unwrap();

        assert!(!encoded.contains('<'));
        assert!(!encoded.contains('&'));
        let decoded: Vec<String> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_build_charts_with_empty_summary() {
        let mut summary = create_test_summary();
        summary.feature_usage.clear();
        summary.top_sections.clear();
        summary.categories.clear();

        let charts = build_charts(&summary);

        assert_eq!(charts.len(), 3);
        assert!(charts.iter().all(|c| c.labels.is_empty() && c.values.is_empty()));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_summary()).unwrap();

        assert!(json.contains("\"feature_usage\""));
        assert!(json.contains("\"avg_req_to_rec\""));
        assert!(json.contains("\"top_sections\""));
        assert!(json.contains("\"categories\""));
    }
}
