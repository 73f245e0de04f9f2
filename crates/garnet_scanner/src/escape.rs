//! Backslash escapes inside expanding string bodies.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid escape sequence: {text}")]
pub struct EscapeError {
    /// The escape as written, including the backslash.
    pub text: String,
}

fn hex_value(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}

/// `\x` and octal escapes denote a single byte. Bodies are held as `str`,
/// so only ASCII bytes are representable.
fn push_byte(out: &mut String, value: u32, text: &str) -> Result<(), EscapeError> {
    if value > 0x7f {
        return Err(EscapeError {
            text: text.to_string(),
        });
    }
    push_code_point(out, value, text)
}

fn push_code_point(out: &mut String, cp: u32, text: &str) -> Result<(), EscapeError> {
    match char::from_u32(cp) {
        Some(c) => {
            out.push(c);
            Ok(())
        }
        None => Err(EscapeError {
            text: text.to_string(),
        }),
    }
}

/// Decode the escape starting at `bytes[start]` (which must be `\`), append
/// its value to `out` and return the index just past it.
///
/// A backslash before a newline is a line continuation and appends nothing.
pub fn read_escape(bytes: &[u8], start: usize, out: &mut String) -> Result<usize, EscapeError> {
    debug_assert_eq!(bytes[start], b'\\');
    let Some(&c) = bytes.get(start + 1) else {
        return Err(EscapeError {
            text: "\\".to_string(),
        });
    };
    let simple = match c {
        b'n' => Some('\n'),
        b't' => Some('\t'),
        b's' => Some(' '),
        b'r' => Some('\r'),
        b'0' if !matches!(bytes.get(start + 2), Some(b'0'..=b'7')) => Some('\0'),
        b'a' => Some('\x07'),
        b'b' => Some('\x08'),
        b'e' => Some('\x1b'),
        b'f' => Some('\x0c'),
        b'v' => Some('\x0b'),
        _ => None,
    };
    if let Some(ch) = simple {
        out.push(ch);
        return Ok(start + 2);
    }

    match c {
        b'\n' => Ok(start + 2),
        b'\r' if bytes.get(start + 2) == Some(&b'\n') => Ok(start + 3),
        b'x' => {
            let mut i = start + 2;
            let mut value = 0u32;
            while i < bytes.len() && i < start + 4 {
                match hex_value(bytes[i]) {
                    Some(v) => value = value * 16 + v,
                    None => break,
                }
                i += 1;
            }
            if i == start + 2 {
                return Err(EscapeError {
                    text: "\\x".to_string(),
                });
            }
            push_byte(out, value, &String::from_utf8_lossy(&bytes[start..i]))?;
            Ok(i)
        }
        b'0'..=b'7' => {
            let mut i = start + 1;
            let mut value = 0u32;
            while i < bytes.len() && i < start + 4 && (b'0'..=b'7').contains(&bytes[i]) {
                value = value * 8 + (bytes[i] - b'0') as u32;
                i += 1;
            }
            push_byte(out, value, &String::from_utf8_lossy(&bytes[start..i]))?;
            Ok(i)
        }
        b'u' if bytes.get(start + 2) == Some(&b'{') => {
            // \u{41 42 43}
            let mut i = start + 3;
            loop {
                while bytes.get(i) == Some(&b' ') {
                    i += 1;
                }
                match bytes.get(i) {
                    Some(b'}') => return Ok(i + 1),
                    Some(&b) if hex_value(b).is_some() => {
                        let mut value = 0u32;
                        while let Some(v) = bytes.get(i).and_then(|&b| hex_value(b)) {
                            value = value.saturating_mul(16).saturating_add(v);
                            i += 1;
                        }
                        push_code_point(out, value, &String::from_utf8_lossy(&bytes[start..i]))?;
                    }
                    _ => {
                        return Err(EscapeError {
                            text: String::from_utf8_lossy(&bytes[start..i.min(bytes.len())])
                                .into_owned(),
                        })
                    }
                }
            }
        }
        b'u' => {
            let end = start + 6;
            if end > bytes.len() || !bytes[start + 2..end].iter().all(|&b| hex_value(b).is_some()) {
                return Err(EscapeError {
                    text: String::from_utf8_lossy(&bytes[start..end.min(bytes.len())]).into_owned(),
                });
            }
            let value = bytes[start + 2..end]
                .iter()
                .fold(0u32, |acc, &b| acc * 16 + hex_value(b).unwrap_or(0));
            push_code_point(out, value, &String::from_utf8_lossy(&bytes[start..end]))?;
            Ok(end)
        }
        _ => {
            // Any other escaped character stands for itself.
            let rest = std::str::from_utf8(&bytes[start + 1..]).unwrap_or("");
            match rest.chars().next() {
                Some(ch) => {
                    out.push(ch);
                    Ok(start + 1 + ch.len_utf8())
                }
                None => Err(EscapeError {
                    text: "\\".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unescape(src: &str) -> (String, usize) {
        let mut out = String::new();
        let end = read_escape(src.as_bytes(), 0, &mut out).unwrap();
        (out, end)
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(unescape("\\n"), ("\n".to_string(), 2));
        assert_eq!(unescape("\\s"), (" ".to_string(), 2));
        assert_eq!(unescape("\\e"), ("\x1b".to_string(), 2));
        assert_eq!(unescape("\\\""), ("\"".to_string(), 2));
    }

    #[test]
    fn test_numeric_escapes() {
        assert_eq!(unescape("\\x41rest"), ("A".to_string(), 4));
        assert_eq!(unescape("\\101"), ("A".to_string(), 4));
        assert_eq!(unescape("\\u00e9"), ("é".to_string(), 6));
        assert_eq!(unescape("\\u{48 49}"), ("HI".to_string(), 9));
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(unescape("\\\nabc"), (String::new(), 2));
    }

    #[test]
    fn test_invalid_hex_escape() {
        let mut out = String::new();
        let err = read_escape(b"\\xg", 0, &mut out).unwrap_err();
        assert_eq!(err.text, "\\x");
    }

    #[test]
    fn test_non_ascii_byte_escapes_rejected() {
        let mut out = String::new();
        let err = read_escape(b"\\xff", 0, &mut out).unwrap_err();
        assert_eq!(err.text, "\\xff");
        assert_eq!(err.to_string(), "invalid escape sequence: \\xff");
        let err = read_escape(b"\\377", 0, &mut out).unwrap_err();
        assert_eq!(err.text, "\\377");
        assert!(out.is_empty());
        assert_eq!(unescape("\\x7f"), ("\x7f".to_string(), 4));
    }

    #[test]
    fn test_escape_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&EscapeError { text: "\\q".to_string() });
    }
}
