use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One raw CSV row: header name -> field value, in whatever casing the file
/// used. The normalizer resolves header aliases; extra columns ride along
/// and are ignored downstream.
pub type RawRow = HashMap<String, String>;

/// Count data rows for progress reporting: physical lines minus one header
/// line, floored at zero for empty or header-only files.
pub fn count_data_rows(path: &Path) -> io::Result<usize> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut lines = 0usize;
    let mut buf = String::new();
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        lines += 1;
    }

    Ok(lines.saturating_sub(1))
}

/// Lazy, finite, non-restartable sequence of row batches over one CSV file.
///
/// Rows keep file order within a batch and batches are emitted in file
/// order. `flexible` parsing tolerates short or long records the way the
/// upstream producers actually write them.
pub struct CsvBatches {
    records: csv::StringRecordsIntoIter<File>,
    headers: csv::StringRecord,
    batch_size: usize,
}

impl CsvBatches {
    pub fn open(path: &Path, batch_size: usize) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();

        Ok(Self {
            records: reader.into_records(),
            headers,
            batch_size,
        })
    }

    /// Next batch of raw rows; `Ok(None)` once the input is exhausted.
    pub fn next_batch(&mut self) -> Result<Option<Vec<RawRow>>, csv::Error> {
        let mut batch = Vec::with_capacity(self.batch_size);

        while batch.len() < self.batch_size {
            match self.records.next() {
                Some(record) => {
                    let record = record?;
                    let mut row = RawRow::with_capacity(self.headers.len());
                    for (header, value) in self.headers.iter().zip(record.iter()) {
                        row.insert(header.to_string(), value.to_string());
                    }
                    batch.push(row);
                }
                None => break,
            }
        }

        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}
