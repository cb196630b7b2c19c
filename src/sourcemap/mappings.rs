//! Decoding and encoding of the `mappings` string into per-line segments.
//!
//! Generated columns restart at zero on every line; source index, original
//! line, original column and name index are deltas across the whole map.

use super::{vlq, SourceMapError};

/// Position in an original source that a generated column maps back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Original {
    pub source: u32,
    pub line: u32,
    pub column: u32,
    pub name: Option<u32>,
}

/// One mapping segment on a generated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_column: u32,
    pub original: Option<Original>,
}

fn to_u32(value: i64) -> Result<u32, SourceMapError> {
    u32::try_from(value)
        .map_err(|_| SourceMapError::InvalidVlq(format!("position {} out of range", value)))
}

fn decode_fields(field: &str) -> Result<Vec<i64>, SourceMapError> {
    let mut bytes = field.as_bytes();
    let mut values = Vec::with_capacity(5);
    while !bytes.is_empty() {
        let (value, consumed) = vlq::decode(bytes)?;
        values.push(value);
        bytes = &bytes[consumed..];
    }
    Ok(values)
}

/// Decode a `mappings` string into one `Vec<Segment>` per generated line.
pub fn decode(mappings: &str) -> Result<Vec<Vec<Segment>>, SourceMapError> {
    let mut lines = Vec::new();
    let (mut source, mut line, mut column, mut name) = (0i64, 0i64, 0i64, 0i64);

    for text in mappings.split(';') {
        let mut segments = Vec::new();
        let mut generated_column = 0i64;

        for field in text.split(',').filter(|f| !f.is_empty()) {
            let values = decode_fields(field)?;
            generated_column += values[0];

            let original = match values.len() {
                1 => None,
                4 | 5 => {
                    source += values[1];
                    line += values[2];
                    column += values[3];
                    let name_index = if values.len() == 5 {
                        name += values[4];
                        Some(to_u32(name)?)
                    } else {
                        None
                    };
                    Some(Original {
                        source: to_u32(source)?,
                        line: to_u32(line)?,
                        column: to_u32(column)?,
                        name: name_index,
                    })
                }
                n => {
                    return Err(SourceMapError::InvalidVlq(format!(
                        "segment '{}' has {} fields",
                        field, n
                    )))
                }
            };

            segments.push(Segment {
                generated_column: to_u32(generated_column)?,
                original,
            });
        }

        lines.push(segments);
    }

    Ok(lines)
}

/// Encode per-line segments back into a `mappings` string.
pub fn encode(lines: &[Vec<Segment>]) -> String {
    let mut out = String::new();
    let (mut source, mut line, mut column, mut name) = (0i64, 0i64, 0i64, 0i64);

    for (i, segments) in lines.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        let mut generated_column = 0i64;

        for (j, segment) in segments.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            vlq::encode(segment.generated_column as i64 - generated_column, &mut out);
            generated_column = segment.generated_column as i64;

            if let Some(original) = segment.original {
                vlq::encode(original.source as i64 - source, &mut out);
                vlq::encode(original.line as i64 - line, &mut out);
                vlq::encode(original.column as i64 - column, &mut out);
                source = original.source as i64;
                line = original.line as i64;
                column = original.column as i64;

                if let Some(index) = original.name {
                    vlq::encode(index as i64 - name, &mut out);
                    name = index as i64;
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_relative_positions_across_lines() {
        let lines = decode("AAAA,IAAI;AACA").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][1].generated_column, 4);
        assert_eq!(lines[0][1].original.unwrap().column, 4);
        // Generated column resets, original line continues from the previous segment
        assert_eq!(lines[1][0].generated_column, 0);
        assert_eq!(lines[1][0].original.unwrap().line, 1);
        assert_eq!(lines[1][0].original.unwrap().column, 4);
    }

    #[test]
    fn decodes_unmapped_and_named_segments() {
        let lines = decode("A,CAAAA").unwrap();
        assert_eq!(lines[0][0].original, None);
        assert_eq!(lines[0][1].original.unwrap().name, Some(0));
    }

    #[test]
    fn empty_lines_are_preserved() {
        let lines = decode(";;AAAA").unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].is_empty());
        assert_eq!(encode(&lines), ";;AAAA");
    }

    #[test]
    fn encode_reproduces_canonical_input() {
        let input = "AAAA,SAASA,IAAI;AACA,CAAC;;EAAEC";
        assert_eq!(encode(&decode(input).unwrap()), input);
    }

    #[test]
    fn segment_with_two_fields_is_rejected() {
        assert!(decode("AA").is_err());
    }

    #[test]
    fn negative_position_is_rejected() {
        assert!(decode("AAAD").is_err());
    }
}
