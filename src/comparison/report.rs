use std::io::Write;

use serde::Serialize;

use super::Comparison;
use crate::config::Scenario;
use crate::error::EmissionError;
use crate::observer::RecordingObserver;

/// One line of the tab-separated comparison table.
#[derive(Debug, Serialize)]
struct ReportRow {
    t: f64,
    #[serde(rename = "air analytic")]
    air_analytic: f64,
    #[serde(rename = "air numeric")]
    air_numeric: f64,
    #[serde(rename = "product analytic")]
    product_analytic: f64,
    #[serde(rename = "product numeric")]
    product_numeric: f64,
}

/// Writes `t, air analytic, air numeric, product analytic, product numeric`,
/// one tab-separated line per grid point, with a header line.
pub fn write_report<W: Write>(comparison: &Comparison, writer: W) -> Result<(), EmissionError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_writer(writer);
    for p in comparison.points() {
        writer.serialize(ReportRow {
            t: p.t,
            air_analytic: p.air_analytic,
            air_numeric: p.air_numeric,
            product_analytic: p.product_analytic,
            product_numeric: p.product_numeric,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// [write_report] into a `String`.
pub fn report_to_string(comparison: &Comparison) -> Result<String, EmissionError> {
    let mut buffer = Vec::new();
    write_report(comparison, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        EmissionError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

/// Writes the scenario parameters followed by one line per recorded evaluation.
pub fn write_trace<W: Write>(
    scenario: &Scenario,
    recorder: &RecordingObserver,
    mut writer: W,
) -> Result<(), EmissionError> {
    writeln!(writer, "C0 = {}", scenario.c0)?;
    writeln!(writer, "T = {}", scenario.t_end)?;
    writeln!(writer, "tf = {}", scenario.tf)?;
    writeln!(writer, "k02 = {}", scenario.k02)?;
    writeln!(writer, "k12 = {}", scenario.k12)?;
    writeln!(writer, "relTol = {}", scenario.rel_tol)?;
    writeln!(writer)?;
    writeln!(writer, "Eval type\tt\tCair\tCproduct\tmodel/jacobian values")?;
    for line in recorder.lines() {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}
