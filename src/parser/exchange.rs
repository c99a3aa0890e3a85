//! Structured financial-exchange statement parsing
//!
//! The format is a tree-structured SGML text in the OFX family: repeated
//! `<STMTTRN>`...`</STMTTRN>` blocks, each carrying one transaction with a
//! posting date, a signed amount, a name/memo pair and an optional reference.
//! Amounts arrive already signed, so direction is derived from the sign.

use chrono::NaiveDate;

use crate::types::{Direction, ParseIssue, ParseOutcome, ParsedLine, ReconResult};
use crate::utils::amount::parse_decimal;

/// Fields collected while inside one transaction block
#[derive(Debug, Default)]
struct BlockState {
    opened_at: usize,
    date: Option<NaiveDate>,
    signed_minor: Option<i64>,
    name: Option<String>,
    memo: Option<String>,
    reference: Option<String>,
    field_errors: Vec<(String, String)>,
}

/// Parse exchange-format statement bytes into canonical lines
pub fn parse_exchange(bytes: &[u8]) -> ReconResult<ParseOutcome> {
    let text = String::from_utf8_lossy(bytes);
    let mut outcome = ParseOutcome::default();
    let mut block: Option<BlockState> = None;
    let mut block_no = 0usize;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("<STMTTRN>") {
            block_no += 1;
            // An unterminated previous block is dropped with an issue
            if let Some(open) = block.take() {
                outcome.issues.push(ParseIssue {
                    line: open.opened_at,
                    field: "block".to_string(),
                    message: "transaction block not terminated".to_string(),
                    raw: "<STMTTRN>".to_string(),
                });
            }
            block = Some(BlockState {
                opened_at: line_no,
                ..BlockState::default()
            });
            continue;
        }

        if line.eq_ignore_ascii_case("</STMTTRN>") {
            if let Some(state) = block.take() {
                match finish_block(state, block_no) {
                    Ok(parsed) => outcome.lines.push(parsed),
                    Err(issue) => outcome.issues.push(issue),
                }
            }
            continue;
        }

        let Some(state) = block.as_mut() else {
            // Envelope tags outside transaction blocks are not ours to parse
            continue;
        };

        if let Some((tag, value)) = split_tag(line) {
            apply_tag(state, &tag, value);
        }
    }

    if let Some(open) = block {
        outcome.issues.push(ParseIssue {
            line: open.opened_at,
            field: "block".to_string(),
            message: "transaction block not terminated".to_string(),
            raw: "<STMTTRN>".to_string(),
        });
    }

    Ok(outcome)
}

/// Split an SGML element line `<TAG>value` into (TAG, value)
fn split_tag(line: &str) -> Option<(String, &str)> {
    let rest = line.strip_prefix('<')?;
    let close = rest.find('>')?;
    let tag = rest[..close].to_ascii_uppercase();
    if tag.starts_with('/') {
        return None;
    }
    Some((tag, rest[close + 1..].trim()))
}

fn apply_tag(state: &mut BlockState, tag: &str, value: &str) {
    match tag {
        "DTPOSTED" => {
            // Timestamps carry timezone suffixes; the date is the YYYYMMDD prefix
            let date = value
                .get(..8)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok());
            match date {
                Some(d) => state.date = Some(d),
                None => state.field_errors.push((
                    "date".to_string(),
                    format!("expected YYYYMMDD, got '{value}'"),
                )),
            }
        }
        "TRNAMT" => match parse_decimal(value) {
            Ok(minor) => state.signed_minor = Some(minor),
            Err(e) => state
                .field_errors
                .push(("amount".to_string(), e.to_string())),
        },
        "NAME" => state.name = Some(value.to_string()),
        "MEMO" => state.memo = Some(value.to_string()),
        "CHECKNUM" | "REFNUM" => {
            if state.reference.is_none() && !value.is_empty() {
                state.reference = Some(value.to_string());
            }
        }
        _ => {}
    }
}

// Issues are keyed by the source line the block opens on, matching the
// unterminated-block reports
fn finish_block(state: BlockState, block_no: usize) -> Result<ParsedLine, ParseIssue> {
    let opened_at = state.opened_at;
    if let Some((field, message)) = state.field_errors.into_iter().next() {
        return Err(ParseIssue {
            line: opened_at,
            field,
            message,
            raw: format!("transaction block {block_no}"),
        });
    }

    let missing = |field: &str| ParseIssue {
        line: opened_at,
        field: field.to_string(),
        message: format!("missing <{}>", if field == "date" { "DTPOSTED" } else { "TRNAMT" }),
        raw: format!("transaction block {block_no}"),
    };

    let date = state.date.ok_or_else(|| missing("date"))?;
    let signed_minor = state.signed_minor.ok_or_else(|| missing("amount"))?;

    let (direction, amount_minor) = if signed_minor < 0 {
        (Direction::Debit, -signed_minor)
    } else {
        (Direction::Credit, signed_minor)
    };

    let description = match (state.name.as_deref(), state.memo.as_deref()) {
        (Some(name), Some(memo)) if !name.is_empty() && !memo.is_empty() => {
            format!("{name} - {memo}")
        }
        (Some(name), _) if !name.is_empty() => name.to_string(),
        (_, Some(memo)) if !memo.is_empty() => memo.to_string(),
        _ => String::new(),
    };

    Ok(ParsedLine {
        date,
        description,
        document_ref: state.reference,
        direction,
        amount_minor,
        // The exchange format carries a statement-level balance only
        balance_minor: None,
    })
}
