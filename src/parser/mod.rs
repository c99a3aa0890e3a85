//! Statement parsing
//!
//! Converts raw bytes of one uploaded file, tagged with a declared format,
//! into an ordered sequence of canonical lines. Pure functions, no side
//! effects. Per-line failures are recoverable issues; only a file with zero
//! parseable lines is a parse failure.

pub mod delimited;
pub mod exchange;

use crate::types::{ParseOutcome, ReconError, ReconResult, StatementFormat};

pub use delimited::{ColumnAliases, DelimitedConfig, FallbackColumns};

/// Parse statement bytes into canonical lines
///
/// `config` only applies to the delimited format; the exchange format is
/// self-describing. Returns `ReconError::Parse` when not a single line could
/// be extracted, otherwise the lines in source order together with any
/// recoverable per-line issues.
pub fn parse(
    bytes: &[u8],
    format: StatementFormat,
    config: &DelimitedConfig,
) -> ReconResult<ParseOutcome> {
    let outcome = match format {
        StatementFormat::Delimited => delimited::parse_delimited(bytes, config)?,
        StatementFormat::Exchange => exchange::parse_exchange(bytes)?,
    };

    if outcome.lines.is_empty() {
        return Err(ReconError::Parse {
            issues: outcome.issues,
        });
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    #[test]
    fn test_empty_file_is_a_parse_failure() {
        let result = parse(b"", StatementFormat::Delimited, &DelimitedConfig::default());
        assert!(matches!(result, Err(ReconError::Parse { .. })));
    }

    #[test]
    fn test_all_rows_bad_is_a_parse_failure() {
        let data = b"not-a-date,stuff,not-an-amount\nalso bad,x,y\n";
        let result = parse(data, StatementFormat::Delimited, &DelimitedConfig::default());
        match result {
            Err(ReconError::Parse { issues }) => assert_eq!(issues.len(), 2),
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[test]
    fn test_direction_is_uniform_across_formats() {
        let csv = b"date,description,amount\n2024-03-10,CARD PAYMENT,-25.00\n";
        let csv_outcome = parse(csv, StatementFormat::Delimited, &DelimitedConfig::default())
            .unwrap();
        assert_eq!(csv_outcome.lines[0].direction, Direction::Debit);
        assert_eq!(csv_outcome.lines[0].amount_minor, 2500);

        let ofx = b"<STMTTRN>\n<DTPOSTED>20240310\n<TRNAMT>-25.00\n<NAME>CARD PAYMENT\n</STMTTRN>\n";
        let ofx_outcome = parse(ofx, StatementFormat::Exchange, &DelimitedConfig::default())
            .unwrap();
        assert_eq!(ofx_outcome.lines[0].direction, Direction::Debit);
        assert_eq!(ofx_outcome.lines[0].amount_minor, 2500);
    }
}
