use crate::statistics::{CoverageStatistics, FacetCoverage};

pub trait ReportEmitter {
    /// File name the rendered report is written to.
    fn file_name(&self) -> &'static str;

    fn render(&self, statistics: &CoverageStatistics) -> String;
}

/// Plain-text summary of the delta metrics.
pub struct TextReport;

impl ReportEmitter for TextReport {
    fn file_name(&self) -> &'static str {
        "report.txt"
    }

    fn render(&self, s: &CoverageStatistics) -> String {
        let rule = "=".repeat(72);
        let p = &s.partition;
        let r = &s.rates;

        let mut lines = vec![
            rule.clone(),
            format!("INFORMATION DELTA REPORT: {}", s.document),
            rule,
            String::new(),
            format!("Items extracted:      {:>6}", s.total_items),
            format!("Template/boilerplate: {:>6}", s.out_of_scope),
            format!("In scope:             {:>6}", s.in_scope),
            format!("Assessed:             {:>6}", s.assessed),
            String::new(),
            "COVERAGE (share of assessed items)".to_string(),
            format!("  Covered:       {:>5}  {:>6.1}%", p.covered, r.coverage),
            format!("  Not covered:   {:>5}  {:>6.1}%", p.not_covered, r.not_covered),
            format!("  Contradicted:  {:>5}  {:>6.1}%", p.contradicted, r.contradicted),
            format!("  Unknown:       {:>5}  ({:.1}% of in scope)", p.unknown, r.unknown),
            String::new(),
            format!("  NOVELTY RATE (delta I): {:.1}%", r.novelty),
            String::new(),
            "EVALUATION LABELS (share of in-scope items)".to_string(),
        ];

        for share in &s.labels {
            lines.push(format!(
                "  {:<20} {:>5}  {:>6.1}%",
                share.label.as_str(),
                share.count,
                share.percentage
            ));
        }
        if s.failures.evaluation > 0 {
            lines.push(format!("  {:<20} {:>5}", "(failed)", s.failures.evaluation));
        }
        lines.push(String::new());

        lines.push("COVERAGE BY FACET".to_string());
        for (facet, rows) in &s.coverage_by_facet {
            lines.push(format!("  {}", facet));
            lines.extend(coverage_rows(rows, "    "));
        }
        lines.push(String::new());

        lines.push("BY SECTION".to_string());
        for section in s.sections.iter().filter(|section| section.in_scope > 0) {
            lines.push(format!(
                "  {:<40} n={:<5} covered {:>6.1}%  novelty {:>6.1}%",
                truncate(&section.section, 40),
                section.in_scope,
                section.rates.coverage,
                section.rates.novelty
            ));
        }
        lines.push(String::new());

        lines.push("COVERAGE BY SECTION AND FACET".to_string());
        for section in s.sections.iter().filter(|section| section.in_scope > 0) {
            lines.push(format!("  {}", truncate(&section.section, 68)));
            for (facet, rows) in &section.coverage_by_facet {
                lines.push(format!("    {}", facet));
                lines.extend(coverage_rows(rows, "      "));
            }
        }

        if !s.confidence.is_empty() {
            lines.push(String::new());
            lines.push("CONFIDENCE STATISTICS".to_string());
            for (facet, c) in &s.confidence {
                lines.push(format!(
                    "  {:<14} n={:<5} mean {:.3}  std {:.3}  min {:.3}  max {:.3}",
                    facet.as_str(),
                    c.count,
                    c.mean,
                    c.std,
                    c.min,
                    c.max
                ));
            }
        }

        let f = &s.failures;
        if f.classification + f.retrieval + f.evaluation > 0 {
            lines.push(String::new());
            lines.push(format!(
                "DEGRADED: {} classification, {} retrieval, {} evaluation failures",
                f.classification, f.retrieval, f.evaluation
            ));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Facet values that occur at least once.
fn coverage_rows<'a>(
    rows: &'a [FacetCoverage],
    indent: &'a str,
) -> impl Iterator<Item = String> + 'a {
    rows.iter().filter(|row| row.partition.total() > 0).map(move |row| {
        format!(
            "{indent}{:<18} n={:<5} covered {:>6.1}%  not covered {:>6.1}%  contradicted {:>6.1}%",
            row.value,
            row.partition.total(),
            row.rates.coverage,
            row.rates.not_covered,
            row.rates.contradicted
        )
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
