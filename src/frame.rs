use serde::{Deserialize, Serialize};

/// One intensity value. `None` marks a token that did not parse as an integer.
pub type Cell = Option<i64>;

/// One timestamped sensor grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Original wire text.
    #[serde(rename = "string", alias = "raw")]
    pub raw: String,
    /// Sensor-local clock in milliseconds.
    pub time: Option<i64>,
    pub rows: Vec<Vec<Cell>>,
}

/// Decodes `"<time>:<row>;<row>;..."` where each row is comma separated.
///
/// Never fails. Tokens that are not integers become `None`, and rectangularity
/// is not checked. A message without `:` yields an empty grid.
pub fn parse(raw: &str) -> Frame {
    let (time_part, body) = match raw.split_once(':') {
        Some((time, body)) => (time, Some(body)),
        None => (raw, None),
    };

    let rows: Vec<Vec<Cell>> = match body {
        Some(body) => body
            .split(';')
            .map(|row| row.split(',').map(parse_int).collect())
            .collect(),
        None => Vec::new(),
    };

    Frame {
        raw: raw.to_string(),
        time: parse_int(time_part),
        rows,
    }
}

/// Lenient integer read: leading whitespace, optional sign, then the longest
/// run of decimal digits. Trailing garbage is ignored.
fn parse_int(token: &str) -> Option<i64> {
    let token = token.trim_start();
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let frame = parse("1000:1,1;2,2");
        assert_eq!(frame.raw, "1000:1,1;2,2");
        assert_eq!(frame.time, Some(1000));
        assert_eq!(frame.rows, vec![vec![Some(1), Some(1)], vec![Some(2), Some(2)]]);
    }

    #[test]
    fn test_row_and_cell_counts_follow_separators() {
        let frame = parse("42:1,2,3;4;5,6");
        assert_eq!(frame.time, Some(42));
        assert_eq!(frame.rows.len(), 3);
        let widths: Vec<usize> = frame.rows.iter().map(Vec::len).collect();
        assert_eq!(widths, vec![3, 1, 2]);
    }

    #[test]
    fn test_malformed_tokens_become_none() {
        let frame = parse("abc:1,x;,3");
        assert_eq!(frame.time, None);
        assert_eq!(frame.rows, vec![vec![Some(1), None], vec![None, Some(3)]]);
    }

    #[test]
    fn test_lenient_integer_prefix() {
        assert_eq!(parse_int(" 12abc"), Some(12));
        assert_eq!(parse_int("-7"), Some(-7));
        assert_eq!(parse_int("1.5"), Some(1));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
    }

    #[test]
    fn test_empty_body_and_missing_separator() {
        let frame = parse("5:");
        assert_eq!(frame.time, Some(5));
        assert_eq!(frame.rows, vec![vec![None]]);

        let frame = parse("12345");
        assert_eq!(frame.time, Some(12345));
        assert!(frame.rows.is_empty());
    }

    #[test]
    fn test_json_uses_null_for_unparsed_cells() {
        let frame = parse("1:1,x");
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["string"], "1:1,x");
        assert_eq!(json["rows"], serde_json::json!([[1, null]]));

        let back: Frame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }
}
