use crate::error::ParseError;

pub const EXPAND_SZ_PREFIX: &str = "hex(2):";

/// Decode the comma separated byte list of a `hex(2):` value into a string.
///
/// The bytes are UTF-16LE; decoding stops at the first NUL unit. Separators,
/// line-continuation backslashes and wrapping whitespace are ignored.
pub fn decode_expand_sz(data: &str) -> Result<String, ParseError> {
    let body = data.strip_prefix(EXPAND_SZ_PREFIX).unwrap_or(data);
    let digits: String = body
        .chars()
        .filter(|c| !matches!(c, ',' | '\\') && !c.is_whitespace())
        .collect();
    let bytes =
        hex::decode(&digits).map_err(|e| ParseError::BadValue(format!("invalid hex: {e}")))?;
    let units = bytes
        .chunks_exact(2)
        .map(|p| u16::from_le_bytes([p[0], p[1]]))
        .take_while(|&u| u != 0);
    Ok(char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

/// Unquote a `REG_SZ` value (`"C:\\Users"` -> `C:\Users`).
pub fn decode_sz(data: &str) -> Result<String, ParseError> {
    let inner = data
        .trim()
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| ParseError::BadValue(format!("unquoted string data: {data}")))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(n) => out.push(n),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Decode either string form; other value types are not strings.
pub fn decode_string(data: &str) -> Result<String, ParseError> {
    let data = data.trim();
    if data.starts_with('"') {
        decode_sz(data)
    } else if data.starts_with(EXPAND_SZ_PREFIX) {
        decode_expand_sz(data)
    } else {
        Err(ParseError::BadValue(format!(
            "not a string value: {}",
            data.split(':').next().unwrap_or(data)
        )))
    }
}

/// Inverse of [`decode_expand_sz`], in the layout `reg export` writes.
pub fn encode_expand_sz(s: &str) -> String {
    let mut bytes: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    bytes.extend_from_slice(&[0, 0]);
    let pairs: Vec<String> = bytes.iter().map(|b| hex::encode([*b])).collect();
    format!("{EXPAND_SZ_PREFIX}{}", pairs.join(","))
}
