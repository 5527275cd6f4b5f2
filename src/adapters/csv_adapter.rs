//! CSV sample input and bar output.
//!
//! Input files carry a header row naming at least
//! `datetime,open,high,low,close`; `volume` and `openinterest` are optional
//! and default to zero. Rows are taken in file order: ordering problems are
//! reported by the resampler, not repaired here.

use crate::adapters::replay_feed::ReplayFeed;
use crate::domain::bar::Bar;
use crate::domain::error::BarsmithError;
use crate::domain::timeframe::{Compression, Timeframe};
use chrono::NaiveDateTime;
use std::fs;
use std::io::Write;
use std::path::Path;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OUTPUT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, BarsmithError> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| BarsmithError::Csv {
            reason: format!("invalid datetime: {s}"),
        })
}

struct Columns {
    datetime: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    open_interest: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, BarsmithError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| BarsmithError::Csv {
                reason: format!("missing {name} column"),
            })
        };
        Ok(Self {
            datetime: require("datetime")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
            open_interest: find("openinterest"),
        })
    }
}

fn number(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<f64, BarsmithError> {
    let raw = record.get(index).ok_or_else(|| BarsmithError::Csv {
        reason: format!("line {line}: missing {name} value"),
    })?;
    raw.trim().parse().map_err(|e| BarsmithError::Csv {
        reason: format!("line {line}: invalid {name} value {raw:?}: {e}"),
    })
}

fn optional_number(
    record: &csv::StringRecord,
    index: Option<usize>,
    name: &str,
    line: u64,
) -> Result<f64, BarsmithError> {
    match index {
        Some(i) if record.get(i).is_some_and(|raw| !raw.trim().is_empty()) => {
            number(record, i, name, line)
        }
        _ => Ok(0.0),
    }
}

/// Parses samples from CSV text.
pub fn parse_samples(content: &str) -> Result<Vec<Bar>, BarsmithError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr.headers().map_err(|e| BarsmithError::Csv {
        reason: format!("CSV header error: {e}"),
    })?;
    let columns = Columns::from_headers(headers)?;

    let mut samples = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| BarsmithError::Csv {
            reason: format!("CSV parse error: {e}"),
        })?;
        let line = record.position().map_or(0, |p| p.line());
        let raw_datetime = record.get(columns.datetime).ok_or_else(|| BarsmithError::Csv {
            reason: format!("line {line}: missing datetime value"),
        })?;

        samples.push(Bar {
            timestamp: parse_datetime(raw_datetime)?,
            open: number(&record, columns.open, "open", line)?,
            high: number(&record, columns.high, "high", line)?,
            low: number(&record, columns.low, "low", line)?,
            close: number(&record, columns.close, "close", line)?,
            volume: optional_number(&record, columns.volume, "volume", line)?,
            open_interest: optional_number(&record, columns.open_interest, "openinterest", line)?,
        });
    }
    Ok(samples)
}

pub fn read_samples<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>, BarsmithError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        BarsmithError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read {}: {}", path.display(), e),
        ))
    })?;
    parse_samples(&content)
}

/// Loads a CSV file as a replay feed named after the file stem.
pub fn load_feed<P: AsRef<Path>>(
    path: P,
    timeframe: Timeframe,
    compression: Compression,
) -> Result<ReplayFeed, BarsmithError> {
    let path = path.as_ref();
    let samples = read_samples(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    tracing::info!(feed = %name, samples = samples.len(), "loaded CSV samples");
    Ok(ReplayFeed::new(name, timeframe, compression, samples))
}

pub fn write_bars<W: Write>(writer: W, bars: &[Bar]) -> Result<(), BarsmithError> {
    let csv_err = |e: csv::Error| BarsmithError::Csv {
        reason: format!("CSV write error: {e}"),
    };
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "datetime",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "openinterest",
    ])
    .map_err(csv_err)?;
    for bar in bars {
        wtr.write_record([
            bar.timestamp.format(OUTPUT_DATETIME_FORMAT).to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
            bar.open_interest.to_string(),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_bars_to_path<P: AsRef<Path>>(path: P, bars: &[Bar]) -> Result<(), BarsmithError> {
    let file = fs::File::create(path)?;
    write_bars(file, bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::feed_port::Feed;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn parses_both_datetime_styles() {
        assert_eq!(parse_datetime("2024-01-15T10:00:05").unwrap(), at(10, 0, 5));
        assert_eq!(parse_datetime("2024-01-15 10:00:05").unwrap(), at(10, 0, 5));
        let micros = parse_datetime("2024-01-15 23:59:59.999989").unwrap();
        assert_eq!(micros.and_utc().timestamp_subsec_micros(), 999_989);
        assert!(parse_datetime("15/01/2024").is_err());
    }

    #[test]
    fn parses_full_rows() {
        let content = "datetime,open,high,low,close,volume,openinterest\n\
            2024-01-15T10:00:00,100.0,101.0,99.5,100.5,1200,7\n\
            2024-01-15T10:00:30,100.5,102.0,100.0,101.0,800,8\n";
        let samples = parse_samples(content).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp, at(10, 0, 0));
        assert_eq!(samples[0].high, 101.0);
        assert_eq!(samples[1].volume, 800.0);
        assert_eq!(samples[1].open_interest, 8.0);
    }

    #[test]
    fn optional_columns_default_to_zero() {
        let content = "datetime,open,high,low,close\n2024-01-15 10:00:00,1,2,0.5,1.5\n";
        let samples = parse_samples(content).unwrap();
        assert_eq!(samples[0].volume, 0.0);
        assert_eq!(samples[0].open_interest, 0.0);
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let err = parse_samples("datetime,open,high,close\n").unwrap_err();
        assert!(matches!(err, BarsmithError::Csv { reason } if reason.contains("low")));
    }

    #[test]
    fn bad_number_names_field() {
        let content = "datetime,open,high,low,close\n2024-01-15 10:00:00,1,abc,0.5,1.5\n";
        let err = parse_samples(content).unwrap_err();
        assert!(matches!(err, BarsmithError::Csv { reason } if reason.contains("high")));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_samples("/nonexistent/ticks.csv").unwrap_err();
        assert!(matches!(err, BarsmithError::Io(_)));
    }

    #[test]
    fn written_bars_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bars.csv");
        let mut bar = Bar::tick(at(10, 1, 0), 100.25);
        bar.volume = 3.0;
        write_bars_to_path(&path, &[bar]).unwrap();

        let back = read_samples(&path).unwrap();
        assert_eq!(back, vec![bar]);
    }

    #[test]
    fn load_feed_names_by_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ES_ticks.csv");
        fs::write(&path, "datetime,open,high,low,close\n2024-01-15 10:00:00,1,1,1,1\n").unwrap();
        let feed = load_feed(&path, Timeframe::Ticks, Compression::ONE).unwrap();
        assert_eq!(feed.name(), "ES_ticks");
        assert_eq!(feed.len(), 1);
    }
}
