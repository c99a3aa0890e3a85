//! Delimited-text (CSV-style) statement parsing
//!
//! Columns are matched by a configurable name-to-field mapping when a header
//! row is present, tolerating column reordering; without a header the
//! configured fallback positions apply. Decimal comma and decimal point are
//! both accepted; thousands separators are stripped.

use chrono::NaiveDate;

use crate::types::{Direction, ParseIssue, ParseOutcome, ParsedLine, ReconResult};
use crate::utils::amount::parse_decimal;

/// Header-name aliases for each canonical field, compared lowercased/trimmed
#[derive(Debug, Clone)]
pub struct ColumnAliases {
    pub date: Vec<String>,
    pub description: Vec<String>,
    pub amount: Vec<String>,
    pub reference: Vec<String>,
    pub balance: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            date: names(&["date", "transaction date", "booking date", "value date"]),
            description: names(&["description", "memo", "details", "narrative", "payee"]),
            amount: names(&["amount", "value", "transaction amount"]),
            reference: names(&["reference", "ref", "document", "document number", "doc no"]),
            balance: names(&["balance", "running balance", "closing balance"]),
        }
    }
}

/// Column positions used when the file carries no header row
#[derive(Debug, Clone)]
pub struct FallbackColumns {
    pub date: usize,
    pub description: usize,
    pub amount: usize,
    pub reference: Option<usize>,
    pub balance: Option<usize>,
}

impl Default for FallbackColumns {
    fn default() -> Self {
        Self {
            date: 0,
            description: 1,
            amount: 2,
            reference: Some(3),
            balance: Some(4),
        }
    }
}

/// Configuration for delimited-text parsing
#[derive(Debug, Clone)]
pub struct DelimitedConfig {
    /// Field delimiter byte
    pub delimiter: u8,
    /// Date formats tried in order for the date column
    pub date_formats: Vec<String>,
    /// Header-name aliases
    pub columns: ColumnAliases,
    /// Positions used when no header is detected
    pub fallback: FallbackColumns,
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%d/%m/%Y".to_string(),
                "%d.%m.%Y".to_string(),
                "%Y%m%d".to_string(),
            ],
            columns: ColumnAliases::default(),
            fallback: FallbackColumns::default(),
        }
    }
}

/// Resolved column indexes for one file
#[derive(Debug, Clone)]
struct ColumnMap {
    date: usize,
    description: usize,
    amount: usize,
    reference: Option<usize>,
    balance: Option<usize>,
}

impl ColumnMap {
    fn from_fallback(fallback: &FallbackColumns) -> Self {
        Self {
            date: fallback.date,
            description: fallback.description,
            amount: fallback.amount,
            reference: fallback.reference,
            balance: fallback.balance,
        }
    }

    /// Resolve by header names; requires at least date and amount to be found
    fn from_header(record: &csv::StringRecord, aliases: &ColumnAliases) -> Option<Self> {
        let find = |names: &[String]| -> Option<usize> {
            record.iter().position(|cell| {
                let cell = cell.trim().to_lowercase();
                names.iter().any(|n| *n == cell)
            })
        };

        let date = find(&aliases.date)?;
        let amount = find(&aliases.amount)?;
        let description = find(&aliases.description).unwrap_or(usize::MAX);
        Some(Self {
            date,
            description,
            amount,
            reference: find(&aliases.reference),
            balance: find(&aliases.balance),
        })
    }
}

/// Parse delimited statement bytes into canonical lines
pub fn parse_delimited(bytes: &[u8], config: &DelimitedConfig) -> ReconResult<ParseOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(config.delimiter)
        .flexible(true)
        .from_reader(bytes);

    let mut outcome = ParseOutcome::default();
    let mut columns: Option<ColumnMap> = None;

    for (index, record) in reader.records().enumerate() {
        let line_no = index + 1;
        let record = match record {
            Ok(r) => r,
            Err(err) => {
                outcome.issues.push(ParseIssue {
                    line: line_no,
                    field: "row".to_string(),
                    message: err.to_string(),
                    raw: String::new(),
                });
                continue;
            }
        };

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        // First non-empty row decides the column layout: a row whose cells
        // name known columns is a header and is skipped.
        let map = match &columns {
            Some(map) => map.clone(),
            None => {
                if let Some(map) = ColumnMap::from_header(&record, &config.columns) {
                    columns = Some(map);
                    continue;
                }
                let map = ColumnMap::from_fallback(&config.fallback);
                columns = Some(map.clone());
                map
            }
        };

        match parse_row(&record, &map, config, line_no) {
            Ok(line) => outcome.lines.push(line),
            Err(issue) => outcome.issues.push(issue),
        }
    }

    Ok(outcome)
}

fn parse_row(
    record: &csv::StringRecord,
    map: &ColumnMap,
    config: &DelimitedConfig,
    line_no: usize,
) -> Result<ParsedLine, ParseIssue> {
    let raw = record.iter().collect::<Vec<_>>().join(",");
    let issue = |field: &str, message: String| ParseIssue {
        line: line_no,
        field: field.to_string(),
        message,
        raw: raw.clone(),
    };

    let cell = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

    let date_text = cell(map.date);
    let date = parse_date(date_text, &config.date_formats).ok_or_else(|| {
        issue(
            "date",
            format!(
                "expected one of {:?}, got '{}'",
                config.date_formats, date_text
            ),
        )
    })?;

    let amount_text = cell(map.amount);
    let signed_minor =
        parse_decimal(amount_text).map_err(|e| issue("amount", e.to_string()))?;
    let (direction, amount_minor) = if signed_minor < 0 {
        (Direction::Debit, -signed_minor)
    } else {
        (Direction::Credit, signed_minor)
    };

    let description = if map.description == usize::MAX {
        String::new()
    } else {
        cell(map.description).to_string()
    };

    let document_ref = map
        .reference
        .map(cell)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    // A malformed balance is not worth losing the line over
    let balance_minor = map
        .balance
        .map(cell)
        .filter(|b| !b.is_empty())
        .and_then(|b| parse_decimal(b).ok());

    Ok(ParsedLine {
        date,
        description,
        document_ref,
        direction,
        amount_minor,
        balance_minor,
    })
}

fn parse_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> ParseOutcome {
        parse_delimited(data.as_bytes(), &DelimitedConfig::default()).unwrap()
    }

    #[test]
    fn test_header_detected_and_skipped() {
        let data = "Date,Description,Amount\n2024-03-10,PAYMENT INV 4521,-150.00\n";
        let outcome = parse(data);
        assert_eq!(outcome.lines.len(), 1);
        assert!(outcome.issues.is_empty());
        let line = &outcome.lines[0];
        assert_eq!(line.description, "PAYMENT INV 4521");
        assert_eq!(line.direction, Direction::Debit);
        assert_eq!(line.amount_minor, 15000);
    }

    #[test]
    fn test_reordered_columns_resolved_by_name() {
        let data = "Amount,Reference,Date,Description\n-99.50,4521,2024-01-05,SUPPLIER LTD\n";
        let outcome = parse(data);
        assert_eq!(outcome.lines.len(), 1);
        let line = &outcome.lines[0];
        assert_eq!(line.amount_minor, 9950);
        assert_eq!(line.document_ref.as_deref(), Some("4521"));
        assert_eq!(line.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(line.description, "SUPPLIER LTD");
    }

    #[test]
    fn test_headerless_file_uses_fallback_positions() {
        let data = "2024-02-01,RENT,-1200.00\n2024-02-02,SALARY,2500.00\n";
        let outcome = parse(data);
        assert_eq!(outcome.lines.len(), 2);
        assert_eq!(outcome.lines[0].direction, Direction::Debit);
        assert_eq!(outcome.lines[1].direction, Direction::Credit);
        assert_eq!(outcome.lines[1].amount_minor, 250000);
    }

    #[test]
    fn test_decimal_comma_and_thousands_separator() {
        // A decimal comma would split the cell, so the amount is quoted the
        // way bank exports quote it
        let data = "date,description,amount\n15.03.2024,INVOICE,\"-1.234,56\"\n";
        let outcome = parse(data);
        assert_eq!(outcome.lines.len(), 1);
        assert_eq!(outcome.lines[0].amount_minor, 123456);
        assert_eq!(
            outcome.lines[0].date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_bad_row_is_recoverable() {
        let data = "date,description,amount\n2024-03-10,OK,-10.00\nbogus,BAD,xx\n2024-03-11,ALSO OK,20.00\n";
        let outcome = parse(data);
        assert_eq!(outcome.lines.len(), 2);
        assert_eq!(outcome.issues.len(), 1);
        let issue = &outcome.issues[0];
        assert_eq!(issue.line, 3);
        assert_eq!(issue.field, "date");
        assert!(issue.message.contains("bogus"));
    }

    #[test]
    fn test_source_order_preserved() {
        let data = "2024-01-03,C,-3.00\n2024-01-01,A,-1.00\n2024-01-02,B,-2.00\n";
        let outcome = parse(data);
        let descriptions: Vec<&str> = outcome
            .lines
            .iter()
            .map(|l| l.description.as_str())
            .collect();
        assert_eq!(descriptions, ["C", "A", "B"]);
    }

    #[test]
    fn test_running_balance_column() {
        let data = "date,description,amount,reference,balance\n2024-03-10,SHOP,-50.00,,950.00\n";
        let outcome = parse(data);
        assert_eq!(outcome.lines[0].balance_minor, Some(95000));
        assert_eq!(outcome.lines[0].document_ref, None);
    }
}
