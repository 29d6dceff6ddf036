//! Append-only burn log
//!
//! Converted frames are persisted as CSV with a self-describing header:
//! `#`-prefixed metadata lines (format version, wall-clock start time,
//! sample rate, channel order with units) followed by the column row.
//! Records carry a sequence number and the tick's logical timestamp; gap
//! ticks are recorded as `# gap` comment lines so the time axis stays
//! reconstructible without external context.
//!
//! ```text
//! # static-fire-log v1
//! # start_time: 2026-08-30T14:02:11+00:00
//! # sample_rate_hz: 200
//! # channels: thrust(N),pressure(psi),temperature(C)
//! seq,time_s,thrust_N,pressure_psi,temperature_C
//! 0,0.000000,0.0000,0.1250,21.3000
//! # gap tick=1 time_s=0.005000
//! 1,0.010000,24.7000,0.1250,21.3000
//! ```
//!
//! The writer owns the file exclusively while open. Appends never reorder
//! or silently drop a record; any write failure surfaces immediately so the
//! acquisition loop can halt rather than continue blind. Data reaches the
//! OS at a bounded cadence (`flush_every` records), so a crash loses at
//! most that window.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::channel::Channel;
use crate::convert::{ConvertedFrame, LogRecord};
use crate::error::{DaqError, Result};

/// On-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Metadata stored in the log header
#[derive(Debug, Clone)]
pub struct LogMetadata {
    /// RFC 3339 wall-clock time the log was created
    pub start_time: String,
    /// Target sample rate in Hz
    pub sample_rate_hz: u32,
    /// Channel order of every record row
    pub channels: Vec<Channel>,
}

/// Exclusive append-only writer for one burn log
pub struct LogWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    channels: Vec<Channel>,
    flush_every: usize,
    unflushed: usize,
    records_written: u64,
    last_seq: Option<u64>,
    last_time: Option<f64>,
    finished: bool,
}

impl LogWriter {
    /// Create a new log file and write its header
    ///
    /// Fails with `LogAlreadyOpen` if the path already exists; a burn log
    /// is never reopened or overwritten.
    pub fn create<P: AsRef<Path>>(
        path: P,
        channels: &[Channel],
        sample_rate_hz: u32,
        flush_every: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    DaqError::LogAlreadyOpen(path.clone())
                } else {
                    DaqError::LogWrite(format!("cannot create {}: {}", path.display(), e))
                }
            })?;

        let mut writer = Self {
            writer: BufWriter::new(file),
            path,
            channels: channels.to_vec(),
            flush_every: flush_every.max(1),
            unflushed: 0,
            records_written: 0,
            last_seq: None,
            last_time: None,
            finished: false,
        };
        writer.write_header(sample_rate_hz)?;
        Ok(writer)
    }

    fn write_header(&mut self, sample_rate_hz: u32) -> Result<()> {
        let channel_list = self
            .channels
            .iter()
            .map(|c| format!("{}({})", c.label(), c.unit()))
            .collect::<Vec<_>>()
            .join(",");
        let columns = self
            .channels
            .iter()
            .map(|c| format!("{}_{}", c.label(), c.unit()))
            .collect::<Vec<_>>()
            .join(",");

        writeln!(self.writer, "# static-fire-log v{}", FORMAT_VERSION)
            .and_then(|_| {
                writeln!(
                    self.writer,
                    "# start_time: {}",
                    chrono::Local::now().to_rfc3339()
                )
            })
            .and_then(|_| writeln!(self.writer, "# sample_rate_hz: {}", sample_rate_hz))
            .and_then(|_| writeln!(self.writer, "# channels: {}", channel_list))
            .and_then(|_| writeln!(self.writer, "seq,time_s,{}", columns))
            .map_err(|e| DaqError::LogWrite(e.to_string()))?;
        self.flush()
    }

    /// Append one record in sequence
    ///
    /// The record's channel order must match the configured layout, and
    /// both sequence number and timestamp must be strictly increasing;
    /// anything else would corrupt the burn record and is rejected.
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        if self.finished {
            return Err(DaqError::LogWrite("log already finished".into()));
        }
        if record.frame.channels() != self.channels {
            return Err(DaqError::InvariantViolation(format!(
                "record channel layout {:?} does not match log layout {:?}",
                record.frame.channels(),
                self.channels
            )));
        }
        if let Some(last) = self.last_seq {
            if record.seq <= last {
                return Err(DaqError::LogWrite(format!(
                    "sequence number {} not after {}",
                    record.seq, last
                )));
            }
        }
        if let Some(last) = self.last_time {
            if record.frame.time_s <= last {
                return Err(DaqError::LogWrite(format!(
                    "timestamp {:.6} not after {:.6}",
                    record.frame.time_s, last
                )));
            }
        }

        write!(self.writer, "{},{:.6}", record.seq, record.frame.time_s)
            .map_err(|e| DaqError::LogWrite(e.to_string()))?;
        for (_, value) in &record.frame.values {
            write!(self.writer, ",{:.4}", value).map_err(|e| DaqError::LogWrite(e.to_string()))?;
        }
        writeln!(self.writer).map_err(|e| DaqError::LogWrite(e.to_string()))?;

        self.last_seq = Some(record.seq);
        self.last_time = Some(record.frame.time_s);
        self.records_written += 1;
        self.unflushed += 1;
        if self.unflushed >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Record a gap marker for a tick that produced no valid frame
    pub fn append_gap(&mut self, tick: u64, time_s: f64) -> Result<()> {
        if self.finished {
            return Err(DaqError::LogWrite("log already finished".into()));
        }
        writeln!(self.writer, "# gap tick={} time_s={:.6}", tick, time_s)
            .map_err(|e| DaqError::LogWrite(e.to_string()))?;
        self.unflushed += 1;
        if self.unflushed >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Push buffered records to the OS
    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| DaqError::LogWrite(e.to_string()))?;
        self.unflushed = 0;
        Ok(())
    }

    /// Flush, sync to durable storage and close; idempotent
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush()?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| DaqError::LogWrite(e.to_string()))?;
        self.finished = true;
        Ok(())
    }

    /// Remove the log file, consuming the writer
    ///
    /// For runs that recorded nothing: a header-only file is not a burn
    /// record and is not left on disk.
    pub fn discard(mut self) -> Result<()> {
        self.finished = true;
        std::fs::remove_file(&self.path).map_err(|e| {
            DaqError::LogWrite(format!("cannot remove {}: {}", self.path.display(), e))
        })
    }

    /// Records appended so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.writer.flush();
        }
    }
}

/// Reader for a recorded burn log
pub struct LogReader {
    metadata: LogMetadata,
    records: Vec<LogRecord>,
    gaps: Vec<(u64, f64)>,
}

impl LogReader {
    /// Parse an existing log file back into converted frames
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| DaqError::LogFormat(format!("cannot open {}: {}", path.display(), e)))?;
        let reader = BufReader::new(file);

        let mut start_time = None;
        let mut sample_rate_hz = None;
        let mut channels: Option<Vec<Channel>> = None;
        let mut records = Vec::new();
        let mut gaps = Vec::new();
        let mut version_seen = false;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| DaqError::LogFormat(e.to_string()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix('#') {
                let comment = comment.trim();
                if let Some(v) = comment.strip_prefix("static-fire-log v") {
                    let version: u32 = v
                        .parse()
                        .map_err(|_| DaqError::LogFormat(format!("bad version line: {}", line)))?;
                    if version != FORMAT_VERSION {
                        return Err(DaqError::LogFormat(format!(
                            "unsupported log version {}",
                            version
                        )));
                    }
                    version_seen = true;
                } else if let Some(v) = comment.strip_prefix("start_time:") {
                    start_time = Some(v.trim().to_string());
                } else if let Some(v) = comment.strip_prefix("sample_rate_hz:") {
                    sample_rate_hz = Some(v.trim().parse().map_err(|_| {
                        DaqError::LogFormat(format!("bad sample rate: {}", v.trim()))
                    })?);
                } else if let Some(v) = comment.strip_prefix("channels:") {
                    let mut parsed = Vec::new();
                    for entry in v.trim().split(',') {
                        let label = entry.split('(').next().unwrap_or(entry);
                        parsed.push(label.parse::<Channel>().map_err(|_| {
                            DaqError::LogFormat(format!("unknown channel in header: {}", label))
                        })?);
                    }
                    channels = Some(parsed);
                } else if let Some(v) = comment.strip_prefix("gap ") {
                    gaps.push(Self::parse_gap(v, line_no)?);
                }
                continue;
            }

            if line.starts_with("seq,") {
                continue; // column header
            }

            let channels = channels.as_ref().ok_or_else(|| {
                DaqError::LogFormat(format!("record before channel header at line {}", line_no + 1))
            })?;
            records.push(Self::parse_record(line, channels, line_no)?);
        }

        if !version_seen {
            return Err(DaqError::LogFormat("missing format version line".into()));
        }
        let metadata = LogMetadata {
            start_time: start_time
                .ok_or_else(|| DaqError::LogFormat("missing start_time header".into()))?,
            sample_rate_hz: sample_rate_hz
                .ok_or_else(|| DaqError::LogFormat("missing sample_rate_hz header".into()))?,
            channels: channels
                .ok_or_else(|| DaqError::LogFormat("missing channels header".into()))?,
        };

        Ok(Self {
            metadata,
            records,
            gaps,
        })
    }

    fn parse_gap(text: &str, line_no: usize) -> Result<(u64, f64)> {
        let mut tick = None;
        let mut time_s = None;
        for field in text.split_whitespace() {
            if let Some(v) = field.strip_prefix("tick=") {
                tick = v.parse().ok();
            } else if let Some(v) = field.strip_prefix("time_s=") {
                time_s = v.parse().ok();
            }
        }
        match (tick, time_s) {
            (Some(tick), Some(time_s)) => Ok((tick, time_s)),
            _ => Err(DaqError::LogFormat(format!(
                "malformed gap marker at line {}",
                line_no + 1
            ))),
        }
    }

    fn parse_record(line: &str, channels: &[Channel], line_no: usize) -> Result<LogRecord> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 2 + channels.len() {
            return Err(DaqError::LogFormat(format!(
                "expected {} fields at line {}, got {}",
                2 + channels.len(),
                line_no + 1,
                fields.len()
            )));
        }
        let seq = fields[0]
            .parse()
            .map_err(|_| DaqError::LogFormat(format!("bad seq at line {}", line_no + 1)))?;
        let time_s = fields[1]
            .parse()
            .map_err(|_| DaqError::LogFormat(format!("bad timestamp at line {}", line_no + 1)))?;
        let mut values = Vec::with_capacity(channels.len());
        for (channel, field) in channels.iter().zip(&fields[2..]) {
            let value: f64 = field
                .parse()
                .map_err(|_| DaqError::LogFormat(format!("bad value at line {}", line_no + 1)))?;
            values.push((*channel, value));
        }
        Ok(LogRecord {
            seq,
            frame: ConvertedFrame {
                tick: seq,
                time_s,
                values,
            },
        })
    }

    pub fn metadata(&self) -> &LogMetadata {
        &self.metadata
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Gap markers as (tick, time_s) pairs
    pub fn gaps(&self) -> &[(u64, f64)] {
        &self.gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("sfdaq_{}_{}.csv", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn record(seq: u64, time_s: f64, thrust: f64, pressure: f64) -> LogRecord {
        LogRecord {
            seq,
            frame: ConvertedFrame {
                tick: seq,
                time_s,
                values: vec![(Channel::Thrust, thrust), (Channel::Pressure, pressure)],
            },
        }
    }

    const CHANNELS: [Channel; 2] = [Channel::Thrust, Channel::Pressure];

    #[test]
    fn test_write_read_round_trip() {
        let path = temp_path("round_trip");
        let mut writer = LogWriter::create(&path, &CHANNELS, 200, 50).unwrap();
        writer.append(&record(0, 0.000, 0.0, 0.125)).unwrap();
        writer.append(&record(1, 0.005, 24.7, 0.125)).unwrap();
        writer.append_gap(2, 0.010).unwrap();
        writer.append(&record(3, 0.015, 180.25, 42.5)).unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.records_written(), 3);

        let reader = LogReader::open(&path).unwrap();
        assert_eq!(reader.metadata().sample_rate_hz, 200);
        assert_eq!(reader.metadata().channels, CHANNELS.to_vec());
        assert_eq!(reader.records().len(), 3);
        assert_eq!(reader.gaps(), &[(2, 0.010)]);
        let last = &reader.records()[2];
        assert_eq!(last.seq, 3);
        assert!((last.frame.time_s - 0.015).abs() < 1e-9);
        assert!((last.frame.value(Channel::Thrust).unwrap() - 180.25).abs() < 1e-9);
        assert!((last.frame.value(Channel::Pressure).unwrap() - 42.5).abs() < 1e-9);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_existing_path_rejected() {
        let path = temp_path("exclusive");
        let writer = LogWriter::create(&path, &CHANNELS, 200, 50).unwrap();
        drop(writer);
        assert!(matches!(
            LogWriter::create(&path, &CHANNELS, 200, 50),
            Err(DaqError::LogAlreadyOpen(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let path = temp_path("ordering");
        let mut writer = LogWriter::create(&path, &CHANNELS, 200, 50).unwrap();
        writer.append(&record(5, 0.025, 1.0, 1.0)).unwrap();
        assert!(matches!(
            writer.append(&record(5, 0.030, 1.0, 1.0)),
            Err(DaqError::LogWrite(_))
        ));
        assert!(matches!(
            writer.append(&record(6, 0.025, 1.0, 1.0)),
            Err(DaqError::LogWrite(_))
        ));
        // A correctly ordered record still goes through
        writer.append(&record(6, 0.030, 1.0, 1.0)).unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_channel_layout_mismatch_rejected() {
        let path = temp_path("layout");
        let mut writer = LogWriter::create(&path, &CHANNELS, 200, 50).unwrap();
        let bad = LogRecord {
            seq: 0,
            frame: ConvertedFrame {
                tick: 0,
                time_s: 0.0,
                values: vec![(Channel::Pressure, 1.0), (Channel::Thrust, 1.0)],
            },
        };
        assert!(matches!(
            writer.append(&bad),
            Err(DaqError::InvariantViolation(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_flushed_records_survive_unclean_shutdown() {
        let path = temp_path("durability");
        {
            let mut writer = LogWriter::create(&path, &CHANNELS, 200, 1).unwrap();
            writer.append(&record(0, 0.000, 10.0, 1.0)).unwrap();
            writer.append(&record(1, 0.005, 20.0, 2.0)).unwrap();
            // Dropped without finish(), as after a fatal error
        }
        let reader = LogReader::open(&path).unwrap();
        assert_eq!(reader.records().len(), 2);
        assert!((reader.records()[1].frame.value(Channel::Thrust).unwrap() - 20.0).abs() < 1e-9);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_finish_idempotent() {
        let path = temp_path("finish");
        let mut writer = LogWriter::create(&path, &CHANNELS, 200, 50).unwrap();
        writer.append(&record(0, 0.0, 1.0, 1.0)).unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
        assert!(matches!(
            writer.append(&record(1, 0.005, 1.0, 1.0)),
            Err(DaqError::LogWrite(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unknown_header_channel_rejected() {
        let path = temp_path("header_channel");
        std::fs::write(
            &path,
            "# static-fire-log v1\n\
             # start_time: 2026-08-30T12:00:00+00:00\n\
             # sample_rate_hz: 200\n\
             # channels: torque(Nm)\n\
             seq,time_s,torque_Nm\n",
        )
        .unwrap();
        assert!(matches!(
            LogReader::open(&path),
            Err(DaqError::LogFormat(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_discard_removes_file() {
        let path = temp_path("discard");
        let writer = LogWriter::create(&path, &CHANNELS, 200, 50).unwrap();
        assert!(path.exists());
        writer.discard().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_log_rejected() {
        let path = temp_path("malformed");
        std::fs::write(&path, "seq,time_s,thrust_N\n0,0.0,1.0\n").unwrap();
        assert!(matches!(
            LogReader::open(&path),
            Err(DaqError::LogFormat(_))
        ));
        let _ = std::fs::remove_file(&path);
    }
}
