use std::collections::BTreeMap;
use std::io::Read;

use anyhow::Result;
use csv::StringRecord;
use serde::de::DeserializeOwned;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Maps column names from the first line of a GTFS table to their 0-based position. Producers
/// order columns however they like, so indices must always be looked up by name.
#[derive(Clone, Debug, Default)]
pub struct Header {
    columns: BTreeMap<String, usize>,
    // The cleaned names in file order, for deserializing rows by name
    names: StringRecord,
}

impl Header {
    /// Missing columns are simply absent from the result; use `require` to fail on them.
    pub fn parse(line: &str) -> Self {
        Self::from_record(&split_line(line))
    }

    pub fn from_record(record: &StringRecord) -> Self {
        let mut columns = BTreeMap::new();
        let mut names = StringRecord::new();
        for (idx, name) in record.iter().enumerate() {
            let name = if idx == 0 {
                name.trim_start_matches(BYTE_ORDER_MARK)
            } else {
                name
            };
            let name = unquote(name);
            columns.insert(name.to_string(), idx);
            names.push_field(name);
        }
        Self { columns, names }
    }

    pub fn get(&self, column: &str) -> Option<usize> {
        self.columns.get(column).cloned()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// `table` is only used to describe the problem.
    pub fn require(&self, table: &str, column: &str) -> Result<usize> {
        match self.get(column) {
            Some(idx) => Ok(idx),
            None => bail!("{table} is missing the required column {column}"),
        }
    }

    pub fn names(&self) -> &StringRecord {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Splits one data line into fields, with surrounding quotes and whitespace removed.
pub fn parse_row(line: &str) -> Vec<String> {
    split_line(line)
        .iter()
        .map(|field| unquote(field).to_string())
        .collect()
}

/// Streams the data rows of one GTFS table. The header row is consumed up front, and every field
/// of every row comes out unquoted, the same way `parse_row` splits a line.
pub struct Table<R> {
    name: String,
    header: Header,
    records: csv::StringRecordsIntoIter<R>,
    // 1-based line number of the last record returned, counting the header
    line: u64,
}

impl<R: Read> Table<R> {
    pub fn new<S: Into<String>>(name: S, reader: R) -> Result<Self> {
        let name = name.into();
        let mut records = builder().from_reader(reader).into_records();
        let header = match records.next() {
            Some(record) => {
                Header::from_record(&record.map_err(|err| anyhow!("{name} header: {err}"))?)
            }
            // An empty file just has no columns
            None => Header::default(),
        };
        Ok(Self {
            name,
            header,
            records,
            line: 1,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    /// Deserializes a row returned by this table, matching struct fields to column names.
    /// Columns the struct doesn't name are ignored, and empty fields become `None`.
    pub fn parse<D: DeserializeOwned>(&self, rec: &StringRecord) -> Result<D> {
        rec.deserialize(Some(self.header.names()))
            .map_err(|err| self.describe(err))
    }

    /// Deserializes every remaining row
    pub fn rows<D: DeserializeOwned>(mut self) -> impl Iterator<Item = Result<D>> {
        std::iter::from_fn(move || {
            let rec = match self.next()? {
                Ok(rec) => rec,
                Err(err) => return Some(Err(err)),
            };
            Some(self.parse(&rec))
        })
    }

    fn describe(&self, err: csv::Error) -> anyhow::Error {
        if let csv::ErrorKind::Deserialize { err, .. } = err.kind() {
            let column = err
                .field()
                .and_then(|idx| self.header.names().get(idx as usize));
            return match column {
                Some(column) => anyhow!(
                    "{} line {}: bad {column}: {}",
                    self.name,
                    self.line,
                    err.kind()
                ),
                None => anyhow!("{} line {}: {}", self.name, self.line, err.kind()),
            };
        }
        anyhow!("{} line {}: {err}", self.name, self.line)
    }
}

impl<R: Read> Iterator for Table<R> {
    type Item = Result<StringRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.line = record
            .as_ref()
            .ok()
            .and_then(|rec| rec.position())
            .map(|pos| pos.line())
            .unwrap_or(self.line + 1);
        Some(match record {
            Ok(rec) => Ok(rec.iter().map(unquote).collect()),
            Err(err) => Err(anyhow!("{} line {}: {err}", self.name, self.line)),
        })
    }
}

fn builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    // The header is handled by Header, so the BOM and quoting rules stay in one place
    builder
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

fn split_line(line: &str) -> StringRecord {
    let mut record = StringRecord::new();
    let mut reader = builder().from_reader(line.as_bytes());
    match reader.read_record(&mut record) {
        Ok(true) => record,
        // A lone line is always valid UTF-8 here, so the only failure is an empty line
        _ => StringRecord::new(),
    }
}

// csv only treats a quote as quoting when it opens the field, so ` "route_id"` or a BOM right
// before the quote leave the quotes in place.
fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|x| x.strip_suffix('"'))
        .unwrap_or(field)
        .trim()
}
