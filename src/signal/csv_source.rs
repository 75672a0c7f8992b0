//! Tabular recording loader: one timestamp column plus one column per
//! physical channel. Column positions are resolved from the header by
//! name, so exports may reorder columns freely.

use std::path::Path;

use crate::error::EegError;
use crate::types::DecodedRecording;

const TIMESTAMP_COLUMN: &str = "timestamps";

/// Reads a tabular export into a [`DecodedRecording`].
///
/// Rows with unparsable or missing values are dropped whole; rows are
/// re-sorted by timestamp when the export is not monotonic. The native
/// rate is estimated from the timestamp deltas.
pub(crate) fn load_csv_recording(path: &Path) -> Result<DecodedRecording, EegError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| EegError::csv("open recording", e))?;
    let headers = reader
        .headers()
        .map_err(|e| EegError::csv("read recording header", e))?
        .clone();

    let ts_col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(TIMESTAMP_COLUMN))
        .ok_or_else(|| {
            EegError::invalid_input(format!(
                "recording CSV is missing the '{TIMESTAMP_COLUMN}' column"
            ))
        })?;
    let channel_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != ts_col)
        .map(|(i, h)| (i, h.trim().to_string()))
        .collect();
    if channel_cols.is_empty() {
        return Err(EegError::invalid_input(
            "recording CSV has no channel columns",
        ));
    }

    let mut rows: Vec<(f64, Vec<f32>)> = Vec::new();
    for (row_num, record) in reader.records().enumerate() {
        let record = record.map_err(|e| EegError::csv("read recording row", e))?;
        let Some(ts) = record.get(ts_col).and_then(|v| v.trim().parse::<f64>().ok()) else {
            continue;
        };
        let mut values = Vec::with_capacity(channel_cols.len());
        for (col, _) in &channel_cols {
            match record.get(*col).and_then(|v| v.trim().parse::<f32>().ok()) {
                Some(v) if v.is_finite() => values.push(v),
                _ => break,
            }
        }
        if values.len() == channel_cols.len() {
            rows.push((ts, values));
        } else {
            tracing::trace!(row = row_num, "dropping incomplete recording row");
        }
    }
    if rows.len() < 2 {
        return Err(EegError::invalid_input(
            "recording CSV has fewer than two usable rows",
        ));
    }

    if rows.windows(2).any(|w| w[1].0 <= w[0].0) {
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    let timestamps: Vec<f64> = rows.iter().map(|(ts, _)| *ts).collect();
    let sample_rate_hz = 1.0 / robust_median_dt(&timestamps)?;

    let channels = channel_cols
        .iter()
        .enumerate()
        .map(|(idx, (_, name))| {
            let series: Vec<f32> = rows.iter().map(|(_, values)| values[idx]).collect();
            (name.clone(), series)
        })
        .collect();

    Ok(DecodedRecording {
        channels,
        sample_rate_hz,
    })
}

/// Median timestamp delta after IQR clipping. Wireless exports drop and
/// batch packets, so raw deltas mix the true period with gap outliers.
pub(crate) fn robust_median_dt(timestamps: &[f64]) -> Result<f64, EegError> {
    let mut deltas: Vec<f64> = timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&dt| dt > 0.0)
        .collect();
    if deltas.is_empty() {
        return Err(EegError::invalid_input(
            "timestamps are non-increasing or empty",
        ));
    }
    deltas.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile_sorted(&deltas, 0.25);
    let q3 = quantile_sorted(&deltas, 0.75);
    let iqr = (q3 - q1).max(1e-9);
    let low = (q1 - 1.5 * iqr).max(1e-4);
    let high = (q3 + 1.5 * iqr).min(1.0);

    let clipped: Vec<f64> = deltas
        .iter()
        .copied()
        .filter(|&dt| dt >= low && dt <= high)
        .collect();
    let pool = if clipped.is_empty() { &deltas } else { &clipped };
    let mid = pool.len() / 2;
    let median = if pool.len() % 2 == 1 {
        pool[mid]
    } else {
        (pool[mid - 1] + pool[mid]) / 2.0
    };
    Ok(median.max(1e-6))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let base = pos.floor() as usize;
    let frac = pos - base as f64;
    if base + 1 < sorted.len() {
        sorted[base] * (1.0 - frac) + sorted[base + 1] * frac
    } else {
        sorted[base]
    }
}
