use std::fmt::Write;

use crate::models::{AnalysisResult, IssueAction, Quadrant, SummaryStats};

/// Rows shown in the input preview.
pub const PREVIEW_ROWS: usize = 5;

fn fmt_ratio(value: f64) -> String {
    if value.is_nan() {
        "undefined".to_string()
    } else if value.is_infinite() {
        "∞".to_string()
    } else {
        format!("{value:.3}")
    }
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map(fmt_ratio).unwrap_or_else(|| "n/a".to_string())
}

pub fn describe_quadrant(quadrant: Quadrant) -> &'static str {
    match quadrant {
        Quadrant::Q1 => "high PNR, high IDIR",
        Quadrant::Q2 => "low PNR, high IDIR",
        Quadrant::Q3 => "low PNR, low IDIR",
        Quadrant::Q4 => "high PNR, low IDIR",
        Quadrant::Undefined => "ratios undefined",
    }
}

/// One-line range summary, shared by the report and the terminal output.
pub fn summary_line(summary: &SummaryStats) -> String {
    format!(
        "Max PNR {} | Min PNR {} | Max IDIR {} | Min IDIR {}",
        fmt_stat(summary.max_pnr),
        fmt_stat(summary.min_pnr),
        fmt_stat(summary.max_idir),
        fmt_stat(summary.min_idir)
    )
}

pub fn build_report(source: Option<&str>, result: &AnalysisResult) -> String {
    let mut output = String::new();
    let source_label = source.unwrap_or("uploaded table");

    let _ = writeln!(output, "# PNR–IDIR Classroom Interaction Report");
    let _ = writeln!(
        output,
        "Generated for {} at {} (run {})",
        source_label,
        result.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        result.run_id
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Preview of Uploaded File");
    let _ = writeln!(output, "| # | Speakers | Lecture | Instruction | Question | Response |");
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for (i, row) in result.rows.iter().take(PREVIEW_ROWS).enumerate() {
        let r = &row.record;
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} |",
            i + 1,
            r.speaker_id,
            r.lecture_count,
            r.instruction_count,
            r.question_count,
            r.response_count
        );
    }
    if result.rows.len() > PREVIEW_ROWS {
        let _ = writeln!(output, "_{} more rows_", result.rows.len() - PREVIEW_ROWS);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Computation Formulas");
    let _ = writeln!(output, "- PNR = Response / Instruction");
    let _ = writeln!(output, "- IDIR = (Response + Question) / (Lecture + Instruction)");

    let _ = writeln!(output);
    let _ = writeln!(output, "## PNR–IDIR Range Summary");
    let _ = writeln!(output, "- Max PNR: {}", fmt_stat(result.summary.max_pnr));
    let _ = writeln!(output, "- Min PNR: {}", fmt_stat(result.summary.min_pnr));
    let _ = writeln!(output, "- Max IDIR: {}", fmt_stat(result.summary.max_idir));
    let _ = writeln!(output, "- Min IDIR: {}", fmt_stat(result.summary.min_idir));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Computed PNR and IDIR Values");
    let _ = writeln!(
        output,
        "| # | Speakers | Lecture | Instruction | Question | Response | pnr | idir | Quadrant |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
    for (i, row) in result.rows.iter().enumerate() {
        let r = &row.record;
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            i + 1,
            r.speaker_id,
            r.lecture_count,
            r.instruction_count,
            r.question_count,
            r.response_count,
            fmt_ratio(row.metrics.pnr),
            fmt_ratio(row.metrics.idir),
            row.quadrant
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Speakers per Quadrant");
    for (quadrant, speakers) in &result.groups {
        let _ = writeln!(
            output,
            "- {} ({}): {}",
            quadrant,
            describe_quadrant(*quadrant),
            speakers.join(", ")
        );
    }

    if !result.issues.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Input Issues");
        for issue in &result.issues {
            let action = match issue.action {
                IssueAction::Skipped => "row skipped",
                IssueAction::Zeroed => "treated as zero",
            };
            let _ = writeln!(
                output,
                "- row {}, column {}: {:?} ({})",
                issue.row, issue.column, issue.value, action
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, InvalidPolicy};
    use crate::pipeline::AnalysisPipeline;

    const SAMPLE: &str = "\
Speakers,Lecture,Instruction,Question,Response
A,2,4,1,5
B,10,2,0,1
";

    #[test]
    fn report_lists_summary_and_groups() {
        let result = AnalysisPipeline::new().run_csv(SAMPLE.as_bytes()).unwrap();
        let report = build_report(Some("week1.csv"), &result);

        assert!(report.starts_with("# PNR–IDIR Classroom Interaction Report"));
        assert!(report.contains("Generated for week1.csv"));
        assert!(report.contains("- Max PNR: 1.250"));
        assert!(report.contains("- Min IDIR: 0.083"));
        assert!(report.contains("| 1 | A | 2 | 4 | 1 | 5 | 1.250 | 1.000 | Q1 |"));
        assert!(report.contains("- Q1 (high PNR, high IDIR): A"));
        assert!(report.contains("- Q3 (low PNR, low IDIR): B"));
        assert!(!report.contains("Q2 ("));
        assert!(!report.contains("## Input Issues"));
    }

    #[test]
    fn preview_shows_only_the_first_rows() {
        let mut csv = String::from("Speakers,Lecture,Instruction,Question,Response\n");
        for i in 1..=7 {
            csv.push_str(&format!("S{i},1,2,1,{i}\n"));
        }
        let result = AnalysisPipeline::new().run_csv(csv.as_bytes()).unwrap();
        let report = build_report(None, &result);

        let preview = report
            .split("## Preview of Uploaded File")
            .nth(1)
            .and_then(|rest| rest.split("## Computation Formulas").next())
            .unwrap();
        assert!(preview.contains("| 1 | S1 | 1 | 2 | 1 | 1 |"));
        assert!(preview.contains("| 5 | S5 | 1 | 2 | 1 | 5 |"));
        assert!(!preview.contains("S6"));
        assert!(preview.contains("_2 more rows_"));
    }

    #[test]
    fn report_lists_recovered_cells() {
        let csv = "Speakers,Lecture,Instruction,Question,Response\nA,2,4,1,5\nB,?,2,0,1\n";
        let pipeline = AnalysisPipeline::with_config(AnalysisConfig {
            on_invalid: InvalidPolicy::TreatAsZero,
            strict: false,
        });
        let report = build_report(None, &pipeline.run_csv(csv.as_bytes()).unwrap());

        assert!(report.contains("Generated for uploaded table"));
        assert!(report.contains("## Input Issues"));
        assert!(report.contains("- row 2, column Lecture: \"?\" (treated as zero)"));
    }

    #[test]
    fn non_finite_ratios_are_spelled_out() {
        assert_eq!(fmt_ratio(f64::NAN), "undefined");
        assert_eq!(fmt_ratio(f64::INFINITY), "∞");
        assert_eq!(fmt_stat(None), "n/a");
        assert_eq!(
            summary_line(&SummaryStats::default()),
            "Max PNR n/a | Min PNR n/a | Max IDIR n/a | Min IDIR n/a"
        );
    }
}
