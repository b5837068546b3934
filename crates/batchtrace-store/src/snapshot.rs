//! JSONL snapshots of batch and relation records.
//!
//! One JSON object per line, tagged by `type`:
//!
//! ```text
//! {"type":"batch","id":"…","code":"RM-FLOUR-001","kind":"raw_material_lot",…}
//! {"type":"relation","tenant_id":"…","id":"…","input_batch_id":"…",…}
//! ```
//!
//! Blank lines are ignored. Relations carry their tenant explicitly because a
//! `BatchRelation` row has no tenant column of its own.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use batchtrace_core::id::TenantId;
use batchtrace_core::model::{Batch, BatchRelation};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapshotRecord {
    Batch(Batch),
    Relation {
        tenant_id: TenantId,
        #[serde(flatten)]
        relation: BatchRelation,
    },
}

/// Parse every record of a snapshot stream.
pub fn read_snapshot<R: BufRead>(reader: R) -> Result<Vec<SnapshotRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|e| StoreError::Snapshot {
            line: idx + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn read_snapshot_path<P: AsRef<Path>>(path: P) -> Result<Vec<SnapshotRecord>> {
    let file = File::open(path)?;
    read_snapshot(BufReader::new(file))
}

/// Streaming NDJSON snapshot writer.
pub struct JsonlSnapshotWriter<W: Write> {
    writer: BufWriter<W>,
}

impl JsonlSnapshotWriter<File> {
    pub fn to_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> JsonlSnapshotWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    pub fn write_record(&mut self, record: &SnapshotRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    pub fn write_all<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a SnapshotRecord>,
    {
        for record in records {
            self.write_record(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
{"type":"batch","id":"00000000-0000-0000-0000-000000000001","code":"RM-FLOUR-001","kind":"raw_material_lot","quantity_produced":100,"unit":"kg","produced_at":0,"site_id":"00000000-0000-0000-0000-000000000009","tenant_id":"00000000-0000-0000-0000-0000000000aa","status":"active"}

{"type":"relation","tenant_id":"00000000-0000-0000-0000-0000000000aa","id":"00000000-0000-0000-0000-000000000100","input_batch_id":"00000000-0000-0000-0000-000000000001","output_batch_id":"00000000-0000-0000-0000-000000000002","quantity_consumed":"99.5","unit":"kg","recorded_at":5}
"#;

    #[test]
    fn reads_tagged_lines_and_skips_blanks() {
        let records = read_snapshot(SNAPSHOT.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        match &records[1] {
            SnapshotRecord::Relation { relation, .. } => {
                assert_eq!(relation.quantity_consumed.to_string(), "99.5");
            }
            other => panic!("expected relation, got {other:?}"),
        }
    }

    #[test]
    fn reports_the_failing_line() {
        let bad = "\n{\"type\":\"batch\"}\n";
        let err = read_snapshot(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::Snapshot { line: 2, .. }));
    }

    #[test]
    fn writer_output_reads_back() {
        let records = read_snapshot(SNAPSHOT.as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.jsonl");
        let mut w = JsonlSnapshotWriter::to_path(&path).unwrap();
        w.write_all(&records).unwrap();
        drop(w);
        assert_eq!(read_snapshot_path(&path).unwrap(), records);
    }
}
