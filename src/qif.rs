use crate::models::{Entry, Field, Transaction};

const DELIMITER: char = '^';

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split raw QIF lines into records. Field order is kept as in the input,
/// unrecognized lines ride along keyed by their line index.
pub fn parse_lines<S: AsRef<str>>(lines: &[S], source: &str) -> Vec<Transaction> {
    let mut res = Vec::new();
    let mut txn = Transaction::new();

    for (idx, raw) in lines.iter().enumerate() {
        let line = raw.as_ref().trim();
        let mut chars = line.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if first == DELIMITER {
            if !txn.is_empty() {
                res.push(std::mem::take(&mut txn));
            }
        } else if let Some(field) = Field::from_tag(first) {
            txn.set(field, Some(chars.as_str().to_string()));
        } else {
            txn.push_line(idx, line.to_string());
        }
    }
    if !txn.is_empty() {
        res.push(txn);
    }

    // back-fill after the loop so present fields keep their positions
    for txn in &mut res {
        txn.backfill();
        txn.filename = source.to_string();
    }
    res
}

/// Parse a whole file's contents. Bytes that are not valid UTF-8 are
/// replaced rather than rejected.
pub fn parse_bytes(raw: &[u8], source: &str) -> Vec<Transaction> {
    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text.lines().collect();
    parse_lines(&lines, source)
}

/// Number of records the tagger will have to skip.
pub fn count_without_payee(transactions: &[Transaction]) -> usize {
    transactions.iter().filter(|t| t.payee().is_none()).count()
}

// ---------------------------------------------------------------------------
// Dumping
// ---------------------------------------------------------------------------

pub fn dump_to_buffer(transactions: &[Transaction]) -> String {
    let mut out = String::new();
    for txn in transactions {
        for entry in &txn.entries {
            match entry {
                Entry::Field {
                    field,
                    value: Some(value),
                } if !value.is_empty() => {
                    out.push(field.tag());
                    out.push_str(value);
                    out.push('\n');
                }
                Entry::Line { text, .. } if !text.is_empty() => {
                    out.push_str(text);
                    out.push('\n');
                }
                _ => {}
            }
        }
        out.push(DELIMITER);
        out.push('\n');
    }
    format!("{}\n", out.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bytes_invalid_utf8() {
        let raw = b"D16/02/2014\nPCaf\xe9 Sully\nT-3.00\n^\nPArt Brut\n^\n";
        let res = parse_bytes(raw, "bank.qif");
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].payee(), Some("Caf\u{fffd} Sully"));
        assert_eq!(res[0].get(Field::Amount), Some("-3.00"));
        assert_eq!(res[1].payee(), Some("Art Brut"));
    }

    const SAMPLE: &str = "!Type:Bank
D16/02/2014
T-7.50
PCARTE 16/02/2014 Sully bar
Mchouffe
^
PArt Brut Shop
D17/02/2014
T-42.00
LClothes
^
";

    fn sample_lines() -> Vec<&'static str> {
        SAMPLE.lines().collect()
    }

    /// Lines built from single-letter kinds, `^` included.
    fn generate_lines(kinds: &str) -> Vec<String> {
        kinds
            .chars()
            .map(|k| match k {
                'P' => "PCARTE 16/02/2014 Sully bar".to_string(),
                'D' => "D16/02/2014".to_string(),
                'M' => "Mchouffe".to_string(),
                other => other.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_parse_default_transaction() {
        let res = parse_lines(&generate_lines("PDM"), "");
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].get(Field::Payee), Some("CARTE 16/02/2014 Sully bar"));
        assert_eq!(res[0].get(Field::Category), None);
        assert!(res[0].has_field(Field::Category));
    }

    #[test]
    fn test_parse_delimiter_optional() {
        let no_delim = parse_lines(&generate_lines("PDM^P"), "");
        let delim_end = parse_lines(&generate_lines("PDM^P^"), "");
        let delim_ends = parse_lines(&generate_lines("^PDM^P^"), "");
        assert_eq!(no_delim.len(), 2);
        assert_eq!(no_delim, delim_end);
        assert_eq!(delim_end, delim_ends);
    }

    #[test]
    fn test_parse_empty_transaction() {
        let res = parse_lines(&generate_lines("PDM^^"), "");
        assert_eq!(res.len(), 1);
    }

    #[test]
    fn test_parse_keeps_field_order() {
        let res = parse_lines(&sample_lines(), "");
        assert_eq!(res.len(), 2);
        let first_two: Vec<&Entry> = res[1].entries.iter().take(2).collect();
        assert!(matches!(first_two[0], Entry::Field { field: Field::Payee, .. }));
        assert!(matches!(first_two[1], Entry::Field { field: Field::Date, .. }));
    }

    #[test]
    fn test_parse_keeps_unrecognized_lines() {
        let res = parse_lines(&sample_lines(), "");
        assert_eq!(
            res[0].entries[0],
            Entry::Line {
                index: 0,
                text: "!Type:Bank".to_string()
            }
        );
    }

    #[test]
    fn test_parse_stamps_filename() {
        let res = parse_lines(&sample_lines(), "bank.qif");
        assert!(res.iter().all(|t| t.filename == "bank.qif"));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let lines = vec!["", "  PSully  ", "", "^", "   "];
        let res = parse_lines(&lines, "");
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].payee(), Some("Sully"));
    }

    #[test]
    fn test_dump_to_buffer_roundtrip() {
        let res = parse_lines(&sample_lines(), "bank.qif");
        assert_eq!(dump_to_buffer(&res), SAMPLE);
    }

    #[test]
    fn test_dump_skips_empty_fields_and_filename() {
        let mut res = parse_lines(&generate_lines("PD^"), "bank.qif");
        res[0].set(Field::Category, Some("Bars".into()));
        let out = dump_to_buffer(&res);
        assert_eq!(out, "PCARTE 16/02/2014 Sully bar\nD16/02/2014\nLBars\n^\n");
        assert!(!out.contains("bank.qif"));
    }

    #[test]
    fn test_count_without_payee() {
        let res = parse_lines(&generate_lines("PDM^DM^M"), "");
        assert_eq!(res.len(), 3);
        assert_eq!(count_without_payee(&res), 2);
    }
}
