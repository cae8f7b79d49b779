//! Round-log export: pretty JSON per round, gzip JSON-lines per match.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::Context;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use kyoku_engine::RoundLog;

pub fn write_round_log_json(log: &RoundLog, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, log).context("serializing round log")?;
    writer.flush().with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// One `RoundLog` per line.
pub fn write_match_jsonl<W: Write>(logs: &[RoundLog], mut writer: W) -> anyhow::Result<()> {
    for log in logs {
        serde_json::to_writer(&mut writer, log).context("serializing round log")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_match_jsonl_gz(logs: &[RoundLog], path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    write_match_jsonl(logs, &mut encoder)?;
    encoder
        .finish()
        .with_context(|| format!("finishing gzip stream {}", path.display()))?
        .flush()?;
    Ok(())
}

pub fn read_match_jsonl<R: BufRead>(reader: R) -> anyhow::Result<Vec<RoundLog>> {
    let mut logs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let log = serde_json::from_str(&line).with_context(|| format!("parsing round log on line {}", i + 1))?;
        logs.push(log);
    }
    Ok(logs)
}

/// Reads a match file written by [`write_match_jsonl_gz`]. Plain
/// (uncompressed) JSON-lines files are accepted too; gzip is detected by
/// its magic bytes, not the extension.
pub fn read_match_jsonl_gz(path: impl AsRef<Path>) -> anyhow::Result<Vec<RoundLog>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader.fill_buf()?.starts_with(&[0x1f, 0x8b]);
    let reader: Box<dyn BufRead> = if is_gzip {
        Box::new(BufReader::new(GzDecoder::new(reader)))
    } else {
        Box::new(reader)
    };
    read_match_jsonl(reader)
}

/// Decompresses a gzip buffer into text, for inspecting exported logs.
pub fn gunzip_to_string(bytes: &[u8]) -> anyhow::Result<String> {
    let mut out = String::new();
    GzDecoder::new(bytes).read_to_string(&mut out).context("decompressing")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_loop::{FirstActionSelector, MatchRunner};
    use kyoku_engine::seeding::seed_from_u64;
    use kyoku_engine::{GameLength, GameRule, StandardOracle};
    use std::sync::Arc;

    fn logs() -> Vec<RoundLog> {
        let rule = GameRule {
            length: GameLength::East,
            ..GameRule::default()
        };
        let mut runner = MatchRunner::new(seed_from_u64(8), rule, Arc::new(StandardOracle)).unwrap();
        runner.run_to_completion(&mut FirstActionSelector).unwrap();
        runner.take_logs()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("kyoku-export-{}-{name}", std::process::id()))
    }

    #[test]
    fn gz_file_reads_back() {
        let logs = logs();
        let path = temp_path("match.jsonl.gz");
        write_match_jsonl_gz(&logs, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert_eq!(gunzip_to_string(&bytes).unwrap().lines().count(), logs.len());
        assert_eq!(read_match_jsonl_gz(&path).unwrap(), logs);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn plain_jsonl_is_accepted() {
        let logs = logs();
        let path = temp_path("match.jsonl");
        write_match_jsonl(&logs, File::create(&path).unwrap()).unwrap();
        assert_eq!(read_match_jsonl_gz(&path).unwrap(), logs);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn round_json_carries_tagged_events() {
        let logs = logs();
        let path = temp_path("round.json");
        write_round_log_json(&logs[0], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#""type": "start_round""#));
        assert!(text.contains(r#""type": "round_end""#));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn bad_line_reports_its_number() {
        let err = read_match_jsonl("\n{not json}\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
