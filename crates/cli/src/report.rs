use fetchlog_core::models::RunOutcome;
use fetchlog_core::pipeline::PipelineSummary;
use std::process::ExitCode;

/// Exit status for a finished run. Handled outcomes exit 0 unless `strict`.
pub fn exit_code(outcome: &RunOutcome, strict: bool) -> ExitCode {
    ExitCode::from(exit_status(outcome, strict))
}

pub fn exit_status(outcome: &RunOutcome, strict: bool) -> u8 {
    match outcome {
        RunOutcome::Converted(_) => 0,
        _ if !strict => 0,
        RunOutcome::NoFile => 2,
        RunOutcome::ConversionFailed { .. } => 3,
    }
}

pub fn render_text(summary: &PipelineSummary) -> String {
    let mut lines = Vec::new();
    if let Some(p) = &summary.downloaded {
        lines.push(format!("downloaded: {}", p.display()));
    }
    if let Some(p) = &summary.renamed {
        lines.push(format!("renamed: {}", p.display()));
    }
    lines.push(render_outcome(&summary.outcome));
    lines.join("\n")
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::NoFile => "no log files found".to_string(),
        RunOutcome::Converted(r) => format!(
            "converted {} rows x {} columns -> {}",
            r.rows,
            r.columns.len(),
            r.output.display()
        ),
        RunOutcome::ConversionFailed { source, reason } => {
            format!("conversion of {} failed: {}", source.display(), reason)
        }
    }
}

pub fn render_json(summary: &PipelineSummary) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchlog_core::models::ConversionReport;
    use std::path::PathBuf;

    fn converted() -> RunOutcome {
        RunOutcome::Converted(ConversionReport {
            source: PathBuf::from("/w/logs_2024-01-01_00-00-00.txt"),
            output: PathBuf::from("/w/logs_output_2024-01-01.xlsx"),
            rows: 2,
            columns: vec!["a".into(), "b".into()],
        })
    }

    #[test]
    fn strict_mode_separates_outcomes() {
        let failed = RunOutcome::ConversionFailed {
            source: PathBuf::from("x.txt"),
            reason: "bad".into(),
        };
        assert_eq!(exit_status(&converted(), true), 0);
        assert_eq!(exit_status(&RunOutcome::NoFile, false), 0);
        assert_eq!(exit_status(&failed, false), 0);
        assert_eq!(exit_status(&RunOutcome::NoFile, true), 2);
        assert_eq!(exit_status(&failed, true), 3);
    }

    #[test]
    fn json_summary_tags_status() {
        let summary = PipelineSummary {
            dir: PathBuf::from("/w"),
            downloaded: None,
            renamed: Some(PathBuf::from("/w/logs_2024-01-01_00-00-00.txt")),
            outcome: converted(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_json(&summary).unwrap()).unwrap();
        assert_eq!(value["outcome"]["status"], "converted");
        assert_eq!(value["outcome"]["rows"], 2);
        assert!(value["downloaded"].is_null());

        let text = render_text(&summary);
        assert!(text.contains("converted 2 rows x 2 columns"));
    }
}
