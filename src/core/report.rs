//! Human-readable and JSON renderings of a DiD run.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as FmtWrite;

use crate::core::aggregate::{cell_means, CellMean};
use crate::domain::model::{
    DidAnalysis, DidEffect, DidEffects, DidRecord, OlsFit, RegressionOutcome,
};
use crate::utils::error::Result;

const RULE_WIDTH: usize = 78;
const BANNER: &str = "================ Difference-in-Differences (Wide Format) ================";

fn fmt_num(value: f64, precision: usize) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        (if value > 0.0 { "inf" } else { "-inf" }).to_string()
    } else {
        format!("{:.*}", precision, value)
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| fmt_num(v, 4)).unwrap_or_else(|| "NaN".to_string())
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

pub fn pair_count_line(n_pairs: usize) -> String {
    format!("Number of (pre, post) pairs in DiD dataset: {}", n_pairs)
}

/// First `rows` transitions as an aligned table.
pub fn preview_table(records: &[DidRecord], rows: usize) -> String {
    let header = [
        "", "person_id", "wave_pre", "wave_post", "female", "treated", "wage_pre", "wage_post",
    ];
    if records.is_empty() {
        return format!(
            "Empty DataFrame\nColumns: [{}]\nIndex: []",
            header[1..].join(", ")
        );
    }

    let body: Vec<[String; 8]> = records
        .iter()
        .take(rows)
        .enumerate()
        .map(|(i, r)| {
            let t = &r.transition;
            [
                i.to_string(),
                t.person_id.to_string(),
                t.wave_pre.to_string(),
                t.wave_post.to_string(),
                flag(t.female).to_string(),
                flag(t.treated).to_string(),
                fmt_opt(t.wage_pre),
                fmt_opt(t.wage_post),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in &body {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let header_line: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:>width$}", h, width = w))
        .collect();
    out.push_str(header_line.join("  ").trim_end());
    for row in &body {
        out.push('\n');
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:>width$}", c, width = w))
            .collect();
        out.push_str(&line.join("  "));
    }
    out
}

/// Regression table laid out like a statsmodels OLS summary.
pub fn regression_summary(fit: &OlsFit, generated: DateTime<Local>) -> String {
    let mut out = String::new();
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{:^width$}", "OLS Regression Results", width = RULE_WIDTH);
    let _ = writeln!(out, "{}", heavy);
    let left_right = [
        ("Dep. Variable:", fit.dependent.clone(), "R-squared:", fmt_num(fit.r_squared, 3)),
        ("Model:", "OLS".to_string(), "Adj. R-squared:", fmt_num(fit.adj_r_squared, 3)),
        ("Method:", "Least Squares".to_string(), "F-statistic:", fmt_num(fit.f_stat, 3)),
        (
            "Date:",
            generated.format("%a, %d %b %Y").to_string(),
            "Prob (F-statistic):",
            fmt_num(fit.f_p_value, 3),
        ),
        (
            "Time:",
            generated.format("%H:%M:%S").to_string(),
            "Residual SS:",
            fmt_num(fit.rss, 3),
        ),
        (
            "No. Observations:",
            fit.n_obs.to_string(),
            "Residual var.:",
            fmt_num(fit.residual_variance, 4),
        ),
        (
            "Df Residuals:",
            fit.df_resid.to_string(),
            "Dropped (non-finite):",
            fit.n_dropped.to_string(),
        ),
        ("Df Model:", fit.df_model.to_string(), "Covariance Type:", "nonrobust".to_string()),
    ];
    for (lk, lv, rk, rv) in left_right {
        let _ = writeln!(out, "{:<20}{:>18}   {:<22}{:>15}", lk, lv, rk, rv);
    }
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(
        out,
        "{:<16}{:>10}{:>11}{:>10}{:>9}{:>11}{:>11}",
        "", "coef", "std err", "t", "P>|t|", "[0.025", "0.975]"
    );
    let _ = writeln!(out, "{}", light);
    for c in &fit.coefficients {
        let _ = writeln!(
            out,
            "{:<16}{:>10}{:>11}{:>10}{:>9}{:>11}{:>11}",
            c.name,
            fmt_num(c.estimate, 4),
            fmt_num(c.std_error, 3),
            fmt_num(c.t_stat, 3),
            fmt_num(c.p_value, 3),
            fmt_num(c.ci_lower, 3),
            fmt_num(c.ci_upper, 3),
        );
    }
    let _ = write!(out, "{}", heavy);
    out
}

fn effect_line(effect: &DidEffect) -> String {
    format!(
        "{:<36}{:>10}{:>11}{:>10}{:>9}",
        effect.label,
        fmt_num(effect.estimate, 4),
        fmt_num(effect.std_error, 3),
        fmt_num(effect.t_stat, 3),
        fmt_num(effect.p_value, 3),
    )
}

pub fn effects_section(effects: &DidEffects) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Union entry effect on wage change (DiD):");
    let _ = writeln!(
        out,
        "{:<36}{:>10}{:>11}{:>10}{:>9}",
        "", "estimate", "std err", "t", "P>|t|"
    );
    let _ = writeln!(out, "{}", effect_line(&effects.male));
    let _ = write!(out, "{}", effect_line(&effects.female));
    out
}

pub fn render_text_report(
    analysis: &DidAnalysis,
    preview_rows: usize,
    generated: DateTime<Local>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", pair_count_line(analysis.records.len()));
    let _ = writeln!(out, "{}", preview_table(&analysis.records, preview_rows));
    let _ = writeln!(out, "\n{}", BANNER);
    match &analysis.regression {
        RegressionOutcome::Fitted { fit, effects } => {
            let _ = writeln!(out, "{}", regression_summary(fit, generated));
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", effects_section(effects));
            let _ = writeln!(
                out,
                "Note: standard errors treat each transition as independent (not clustered by person)."
            );
        }
        RegressionOutcome::Unavailable { reason } => {
            let _ = writeln!(out, "Regression unavailable: {}", reason);
        }
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    panel_rows: usize,
    skipped_rows: usize,
    n_pairs: usize,
    preview: Vec<&'a DidRecord>,
    cell_means: Vec<CellMean>,
    regression: &'a RegressionOutcome,
}

pub fn render_json_report(
    analysis: &DidAnalysis,
    preview_rows: usize,
    generated: DateTime<Local>,
) -> Result<String> {
    let report = JsonReport {
        generated_at: generated.to_rfc3339(),
        panel_rows: analysis.panel_rows,
        skipped_rows: analysis.skipped_rows,
        n_pairs: analysis.records.len(),
        preview: analysis.records.iter().take(preview_rows).collect(),
        cell_means: cell_means(&analysis.records),
        regression: &analysis.regression,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
