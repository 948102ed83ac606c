//! Utilities for working with CSV files.
//!
//! Fields containing a delimiter, quote or line break are quoted on write, with embedded quotes
//! doubled. The reader understands the same quoting, including quoted fields that span lines.

use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader, BufWriter, Lines, Read, Write};
use std::ops::Index;
use std::path::Path;

pub struct CsvWriter<W: Write = File> {
    writer: BufWriter<W>,
}
impl CsvWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::create(path)?;
        Ok(Self::wrap(file))
    }
}
impl<W: Write> CsvWriter<W> {
    pub fn wrap(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    pub fn append<R>(&mut self, record: R) -> Result<(), io::Error>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut first = true;
        for datum in record.into_iter() {
            if first {
                first = false;
            } else {
                self.writer.write_all(b",")?;
            }
            let str: &str = datum.as_ref();
            self.writer.write_all(escape(str).as_bytes())?;
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), io::Error> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> Result<W, io::Error> {
        self.writer.into_inner().map_err(|err| err.into_error())
    }
}

fn escape(field: &str) -> Cow<str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Splits one line into its fields, honouring double-quoted fields.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = vec![];
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(char) = chars.next() {
        match (char, quoted) {
            ('"', true) => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            }
            ('"', false) if field.is_empty() => quoted = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (char, _) => field.push(char),
        }
    }
    fields.push(field);
    fields
}

pub struct CsvReader<R: Read = File> {
    lines: Lines<BufReader<R>>,
}
impl CsvReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::open(path)?;
        Ok(Self::wrap(file))
    }
}
impl<R: Read> CsvReader<R> {
    pub fn wrap(inner: R) -> Self {
        Self {
            lines: BufReader::new(inner).lines(),
        }
    }

    pub fn read(&mut self) -> Option<Result<Vec<String>, io::Error>> {
        let mut record = loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => break line,
                Err(err) => return Some(Err(err)),
            }
        };
        // an odd number of quotes leaves a quoted field open across the line break
        while record.matches('"').count() % 2 == 1 {
            match self.lines.next() {
                Some(Ok(line)) => {
                    record.push('\n');
                    record.push_str(&line);
                }
                Some(Err(err)) => return Some(Err(err)),
                None => break,
            }
        }
        Some(Ok(split_line(record.trim_end_matches('\r'))))
    }
}

impl<R: Read> Iterator for CsvReader<R> {
    type Item = Result<Vec<String>, io::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}

/// A row of a flat table under construction, addressable by column ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    items: Vec<Cow<'static, str>>,
}
impl Record {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, || Cow::Borrowed(""));
        Self { items }
    }

    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let items = values
            .into_iter()
            .map(|value| Cow::Owned(value.to_string()))
            .collect();
        Self { items }
    }

    /// Appends a cell; `None` is written as an empty (null) cell.
    pub fn push_opt(&mut self, value: Option<impl ToString>) {
        self.items.push(match value {
            None => Cow::Borrowed(""),
            Some(value) => Cow::Owned(value.to_string()),
        })
    }

    pub fn push(&mut self, value: impl ToString) {
        self.items.push(Cow::Owned(value.to_string()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Record {
    type Item = Cow<'static, str>;
    type IntoIter = std::vec::IntoIter<Cow<'static, str>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<I: Into<usize>> Index<I> for Record {
    type Output = Cow<'static, str>;

    fn index(&self, index: I) -> &Self::Output {
        &self.items[index.into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_back() {
        let mut writer = CsvWriter::wrap(Vec::new());
        writer.append(["id", "name", "note"]).unwrap();
        writer.append(["1", "Duke", "a, b"]).unwrap();
        writer.append(["2", "Say \"hi\"", ""]).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!("id,name,note\n1,Duke,\"a, b\"\n2,\"Say \"\"hi\"\"\",\n", text);

        let rows: Vec<_> = CsvReader::wrap(&bytes[..]).map(Result::unwrap).collect();
        assert_eq!(
            vec![
                vec!["id", "name", "note"],
                vec!["1", "Duke", "a, b"],
                vec!["2", "Say \"hi\"", ""],
            ],
            rows
        );
    }

    #[test]
    fn quoted_line_breaks_span_lines() {
        let mut writer = CsvWriter::wrap(Vec::new());
        writer.append(["1", "first\nsecond", "\"x\"\n"]).unwrap();
        writer.append(["2", "", "last"]).unwrap();
        let bytes = writer.into_inner().unwrap();

        let rows: Vec<_> = CsvReader::wrap(&bytes[..]).map(Result::unwrap).collect();
        assert_eq!(
            vec![vec!["1", "first\nsecond", "\"x\"\n"], vec!["2", "", "last"]],
            rows
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rows: Vec<_> = CsvReader::wrap("a,b\r\n\n1,2\n".as_bytes())
            .map(Result::unwrap)
            .collect();
        assert_eq!(vec![vec!["a", "b"], vec!["1", "2"]], rows);
    }

    #[test]
    fn record_cells() {
        let mut record = Record::with_capacity(1);
        record.push(4.5);
        assert_eq!("", record[0usize]);
        assert_eq!("4.5", record[1usize]);
        record.push_opt(None::<f64>);
        record.push_opt(Some(-3));
        record.push("x");
        assert_eq!(5, record.len());
        let cells: Vec<_> = record.into_iter().collect();
        assert_eq!(vec!["", "4.5", "", "-3", "x"], cells);
    }
}
