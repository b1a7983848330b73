//! File-backed table store.
//!
//! Each table is a JSONL (JSON Lines) file `<data_dir>/<table>.jsonl` with a
//! `<table>.seq` sidecar next to it. The sidecar is never replaced, so every
//! operation locks it rather than the table file, and it records the last id
//! handed out so deleted ids are not reused. Inserts append; deletes rewrite
//! the table through a temp file and an atomic rename. Lines that fail to
//! parse are skipped on read and carried over untouched on rewrite.

use crate::store::{assign_ids, check_delete, max_id, Query, Row, TableStore};
use crate::{Error, RecordId, Result};
use fs2::FileExt;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// JSONL-based table store with file locking
#[derive(Clone, Debug)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    /// Create a store rooted at `dir`; nothing is touched until the first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `table`
    pub fn table_path(&self, table: &str) -> Result<PathBuf> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(Error::Store(format!("invalid table name {:?}", table)));
        }
        Ok(self.dir.join(format!("{}.jsonl", table)))
    }

    /// Sidecar holding the table lock and the last id handed out.
    ///
    /// Deletes replace the table file by rename, so locking the table file
    /// itself would let a waiting writer append to the unlinked copy.
    pub fn seq_path(&self, table: &str) -> Result<PathBuf> {
        self.table_path(table).map(|path| path.with_extension("seq"))
    }

    fn open_seq(&self, table: &str) -> Result<File> {
        let path = self.seq_path(table)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        Ok(file)
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

/// One physical line of a table file
enum Line {
    Parsed(Row),
    Unparsed(String),
}

fn read_lines(file: &File, path: &Path) -> Result<(Vec<Line>, bool)> {
    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(file);
    reader.read_to_string(&mut contents)?;

    let terminated = contents.is_empty() || contents.ends_with('\n');
    let mut lines = Vec::new();

    for (line_num, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(row)) => lines.push(Line::Parsed(row)),
            Ok(_) => {
                tracing::warn!("Skipping non-object row at {:?}:{}", path, line_num + 1);
                lines.push(Line::Unparsed(line.to_string()));
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse row at {:?}:{}: {}",
                    path,
                    line_num + 1,
                    e
                );
                // Keep going; one bad line should not hide the rest of the table
                lines.push(Line::Unparsed(line.to_string()));
            }
        }
    }

    Ok((lines, terminated))
}

fn parsed_rows(lines: Vec<Line>) -> Vec<Row> {
    lines
        .into_iter()
        .filter_map(|l| match l {
            Line::Parsed(row) => Some(row),
            Line::Unparsed(_) => None,
        })
        .collect()
}

impl TableStore for JsonlStore {
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let path = self.table_path(table)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let seq = self.open_seq(table)?;
        // Acquire shared lock for reading
        seq.lock_shared()?;
        let read = File::open(&path)
            .map_err(Error::from)
            .and_then(|file| read_lines(&file, &path));
        seq.unlock()?;

        let rows = parsed_rows(read?.0);
        tracing::debug!("Read {} rows from {}", rows.len(), table);
        Ok(query.apply(rows))
    }

    fn insert(&mut self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let path = self.table_path(table)?;
        self.ensure_dir()?;

        // Held across read-last-id, append and bump so concurrent writers
        // never hand out the same id
        let seq = self.open_seq(table)?;
        seq.lock_exclusive()?;
        let result = append_rows(&seq, &path, rows);
        seq.unlock()?;

        let stored = result?;
        tracing::debug!("Appended {} rows to {}", stored.len(), table);
        Ok(stored)
    }

    fn delete(&mut self, table: &str, query: &Query) -> Result<usize> {
        check_delete(query)?;
        let path = self.table_path(table)?;
        if !path.exists() {
            return Ok(0);
        }

        let seq = self.open_seq(table)?;
        seq.lock_exclusive()?;
        let result = rewrite_without(&seq, &path, query);
        seq.unlock()?;

        let removed = result?;
        if removed > 0 {
            tracing::debug!("Deleted {} rows from {}", removed, table);
        }
        Ok(removed)
    }
}

/// Last id handed out for the table; an empty or unreadable sidecar counts as 0
fn read_seq(seq: &File) -> Result<RecordId> {
    let mut contents = String::new();
    let mut reader = seq;
    reader.seek(SeekFrom::Start(0))?;
    reader.read_to_string(&mut contents)?;

    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    match trimmed.parse() {
        Ok(last) => Ok(last),
        Err(e) => {
            tracing::warn!("Ignoring corrupt id counter {:?}: {}", trimmed, e);
            Ok(0)
        }
    }
}

fn write_seq(seq: &File, last: RecordId) -> Result<()> {
    let mut writer = seq;
    writer.set_len(0)?;
    writer.seek(SeekFrom::Start(0))?;
    writeln!(writer, "{}", last)?;
    writer.flush()?;
    Ok(())
}

fn append_rows(seq: &File, path: &Path, rows: Vec<Row>) -> Result<Vec<Row>> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    let (existing, terminated) = read_lines(&file, path)?;
    let last = read_seq(seq)?.max(max_id(&parsed_rows(existing)));
    let stored = assign_ids(last, rows);

    let mut writer = BufWriter::new(&file);
    if !terminated {
        // A torn final line must not swallow the next record
        writer.write_all(b"\n")?;
    }
    for row in &stored {
        let line = serde_json::to_string(row)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    drop(writer);

    // Rows first: a crash in between leaves the counter behind the file,
    // which the max above recovers from
    write_seq(seq, last.max(max_id(&stored)))?;

    Ok(stored)
}

fn rewrite_without(seq: &File, path: &Path, query: &Query) -> Result<usize> {
    let file = File::open(path)?;
    let (lines, _) = read_lines(&file, path)?;
    drop(file);

    let mut kept = Vec::with_capacity(lines.len());
    let mut removed = 0;
    let mut highest = 0;
    for line in lines {
        match line {
            Line::Parsed(row) => {
                if let Some(id) = row.get("id").and_then(Value::as_i64) {
                    highest = highest.max(id);
                }
                if query.matches(&row) {
                    removed += 1;
                } else {
                    kept.push(serde_json::to_string(&row)?);
                }
            }
            Line::Unparsed(raw) => kept.push(raw),
        }
    }

    if removed == 0 {
        return Ok(0);
    }

    // Removing the newest row must not hand its id out again
    let last = read_seq(seq)?;
    if highest > last {
        write_seq(seq, highest)?;
    }

    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "table path missing parent")
    })?;
    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        for line in &kept {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    // Atomically replace the table file
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(removed)
}
