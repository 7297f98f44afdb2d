//! Loosely-typed CSV table used for raw source files.
//!
//! Raw sources carry whatever columns their adapter wrote, so they are read
//! as strings and projected by column name afterwards.

use std::io::Read;
use std::path::Path;

/// A header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read a CSV table. Short rows are allowed; missing cells read as empty.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn from_path(path: &Path) -> Result<Self, csv::Error> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Column names from `required` that are absent.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.column_index(name).is_none())
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            table: self,
            cells,
        })
    }
}

/// One row with access by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    /// Cell under `column`; `None` when the column does not exist or the row is short.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.column_index(column)?;
        self.cells.get(idx).map(String::as_str)
    }

    /// Like [`Row::get`] but treats a blank cell as missing.
    pub fn get_non_blank(&self, column: &str) -> Option<&'a str> {
        self.get(column).filter(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_headers_and_rows() {
        let csv = "vendor,title,url\nOkta,Breach,https://a\nCisco,Outage\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["vendor", "title", "url"]);
        assert_eq!(table.len(), 2);

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("url"), Some("https://a"));
        assert_eq!(rows[1].get("url"), None);
        assert_eq!(rows[1].get("nope"), None);
    }

    #[test]
    fn test_strips_bom_and_whitespace_in_headers() {
        let csv = "\u{feff}vendor , title\nOkta,x\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.column_index("vendor"), Some(0));
        assert_eq!(table.column_index("title"), Some(1));
    }

    #[test]
    fn test_missing_columns() {
        let table = Table::new(vec!["vendor".into(), "title".into()], vec![]);
        assert_eq!(
            table.missing_columns(&["vendor", "url", "published"]),
            vec!["url", "published"]
        );
    }

    #[test]
    fn test_quoted_cells_with_commas() {
        let csv = "title,risk_tags\n\"Okta, Inc. breach\",\"Data Breach, Lawsuit\"\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(row.get("title"), Some("Okta, Inc. breach"));
        assert_eq!(row.get_non_blank("risk_tags"), Some("Data Breach, Lawsuit"));
    }
}
