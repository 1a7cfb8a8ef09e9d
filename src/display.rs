use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use crate::results::{ReplicateGroup, Summary};

fn style_header() -> Style {
    Style::new().cyan().bold()
}

/// Blue informational line, e.g. the timing summary.
pub fn info_line(msg: &str) -> String {
    msg.if_supports_color(Stream::Stdout, |s| s.blue()).to_string()
}

/// Green completion line, e.g. `Wrote results.tsv!`.
pub fn success_line(msg: &str) -> String {
    msg.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
}

/// Red error text for stderr.
pub fn error_line(msg: &str) -> String {
    msg.if_supports_color(Stream::Stderr, |s| s.red()).to_string()
}

fn fmt_opt_secs(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{:.2}", x),
        None => "n/a".to_string(),
    }
}

fn fmt_opt_int(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
}

/// `mean(sec)=4.00; stdev(sec)=2.00`
pub fn format_summary(summary: &Summary) -> String {
    format!(
        "mean(sec)={:.2}; stdev(sec)={}",
        summary.mean,
        fmt_opt_secs(summary.stdev)
    )
}

/// Aligned per-configuration table of replicate groups.
pub fn format_report(groups: &[ReplicateGroup]) -> String {
    const HEADERS: [&str; 7] = ["command", "numseqs", "k", "ss", "n", "mean(s)", "stdev(s)"];

    let rows: Vec<[String; 7]> = groups
        .iter()
        .map(|g| {
            [
                g.command.to_string(),
                fmt_opt_int(g.numseqs),
                fmt_opt_int(g.k),
                fmt_opt_int(g.ss),
                g.count.to_string(),
                format!("{:.3}", g.mean),
                g.stdev
                    .map(|s| format!("{:.3}", s))
                    .unwrap_or_else(|| "n/a".to_string()),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let header = HEADERS
        .iter()
        .zip(widths.iter())
        .enumerate()
        .map(|(i, (h, w))| pad(h, *w, i == 0))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(
        &header
            .if_supports_color(Stream::Stdout, |s| s.style(style_header()))
            .to_string(),
    );
    out.push('\n');

    for row in &rows {
        let line = row
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(i, (c, w))| pad(c, *w, i == 0))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

// first column left-aligned, numbers right-aligned
fn pad(s: &str, width: usize, left: bool) -> String {
    if left {
        format!("{:<width$}", s, width = width)
    } else {
        format!("{:>width$}", s, width = width)
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    groups: &'a [ReplicateGroup],
    expected_replicates: Option<usize>,
}

pub fn format_report_json(groups: &[ReplicateGroup], expected_replicates: Option<usize>) -> String {
    let report = JsonReport {
        groups,
        expected_replicates,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}
