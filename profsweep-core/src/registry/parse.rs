use std::iter::Peekable;

use crate::error::ParseError;

const SIGNATURES: [&str; 2] = ["Windows Registry Editor Version 5.00", "REGEDIT4"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEntry {
    /// `[path]` section header.
    KeyHeader { path: String },
    /// `"name"=data`, with wrapped continuation lines already joined.
    ValueLine { name: String, raw_data: String },
}

/// Single forward pass over the lines of an export.
pub struct Entries<I: Iterator> {
    lines: Peekable<I>,
    seen: usize,
    recognized: usize,
}

impl<'a, I: Iterator<Item = &'a str>> Entries<I> {
    pub fn new(lines: I) -> Self {
        Self {
            lines: lines.peekable(),
            seen: 0,
            recognized: 0,
        }
    }

    /// Non-blank lines consumed so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Lines that were a header, a value or the file signature.
    pub fn recognized(&self) -> usize {
        self.recognized
    }

    /// Join wrapped value data. Only a line ending in `\` continues.
    fn take_continuations(&mut self, raw: &mut String) {
        while raw.trim_end().ends_with('\\') {
            let Some(&next) = self.lines.peek() else {
                break;
            };
            let starts_indented = next.starts_with(' ') || next.starts_with('\t');
            if !starts_indented || next.trim().is_empty() {
                break;
            }
            let piece = next.trim();
            self.lines.next();
            self.seen += 1;
            trim_wrap(raw);
            raw.push_str(piece);
        }
        trim_wrap(raw);
    }
}

impl<'a, I: Iterator<Item = &'a str>> Iterator for Entries<I> {
    type Item = RegistryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(line) = self.lines.next() {
            let t = line.trim();
            if t.is_empty() {
                continue;
            }
            self.seen += 1;

            if t.len() >= 2 && t.starts_with('[') && t.ends_with(']') {
                self.recognized += 1;
                return Some(RegistryEntry::KeyHeader {
                    path: t[1..t.len() - 1].trim().to_string(),
                });
            }

            if let Some((name, rest)) = split_value(t) {
                self.recognized += 1;
                let mut raw = rest.to_string();
                self.take_continuations(&mut raw);
                return Some(RegistryEntry::ValueLine {
                    name,
                    raw_data: raw,
                });
            }

            if SIGNATURES.iter().any(|s| t.eq_ignore_ascii_case(s)) {
                self.recognized += 1;
            }
            // anything else is tolerated and skipped
        }
        None
    }
}

fn trim_wrap(raw: &mut String) {
    let keep = raw.trim_end().trim_end_matches('\\').trim_end().len();
    raw.truncate(keep);
}

/// Split `"Name"=data` into the unescaped name and the data text.
fn split_value(line: &str) -> Option<(String, &str)> {
    let body = line.strip_prefix('"')?;
    let mut name = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, n) = chars.next()?;
                name.push(n);
            }
            '"' => {
                let rest = body[i + 1..].strip_prefix('=')?;
                return Some((name, rest));
            }
            _ => name.push(c),
        }
    }
    None
}

pub fn entries(text: &str) -> Entries<std::str::Lines<'_>> {
    Entries::new(text.lines())
}

/// Materialize all entries, telling an empty export from an unreadable one.
///
/// An export holding only the signature (or only headers) is valid and may
/// yield few or no values.
pub fn parse_export(text: &str) -> Result<Vec<RegistryEntry>, ParseError> {
    let mut it = entries(text);
    let out: Vec<RegistryEntry> = it.by_ref().collect();
    if it.seen() == 0 {
        return Err(ParseError::Empty);
    }
    if it.recognized() == 0 {
        return Err(ParseError::Unrecognized { lines: it.seen() });
    }
    Ok(out)
}

/// Decode the bytes of an export file. `reg export` writes UTF-16LE with a BOM.
pub fn decode_export_bytes(bytes: &[u8]) -> Result<String, ParseError> {
    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        if body.len() % 2 != 0 {
            return Err(ParseError::BadValue("odd length UTF-16 export".into()));
        }
        let units = body.chunks_exact(2).map(|p| u16::from_le_bytes([p[0], p[1]]));
        return Ok(char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect());
    }
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    Ok(String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::hex::decode_expand_sz;

    const SAMPLE: &str = concat!(
        "Windows Registry Editor Version 5.00\r\n",
        "\r\n",
        "[HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\ProfileList\\S-1-5-21-1]\r\n",
        "\"Flags\"=dword:00000000\r\n",
        "\"ProfileImagePath\"=hex(2):43,00,3a,00,5c,00,55,00,73,00,65,00,72,00,73,00,5c,\\\r\n",
        "  00,61,00,6c,00,69,00,63,00,65,00,00,00\r\n",
        "\"Guid\"=\"{GUID-X}\"\r\n",
    );

    #[test]
    fn headers_and_values_in_order() {
        let v = parse_export(SAMPLE).unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(
            v[0],
            RegistryEntry::KeyHeader {
                path: r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion\ProfileList\S-1-5-21-1".into()
            }
        );
        assert_eq!(
            v[1],
            RegistryEntry::ValueLine {
                name: "Flags".into(),
                raw_data: "dword:00000000".into()
            }
        );
        assert_eq!(
            v[3],
            RegistryEntry::ValueLine {
                name: "Guid".into(),
                raw_data: "\"{GUID-X}\"".into()
            }
        );
    }

    #[test]
    fn continuation_lines_are_joined() {
        let v = parse_export(SAMPLE).unwrap();
        let RegistryEntry::ValueLine { name, raw_data } = &v[2] else {
            panic!("expected value line, got {:?}", v[2]);
        };
        assert_eq!(name, "ProfileImagePath");
        assert!(!raw_data.contains('\\'));
        assert!(!raw_data.contains(' '));
        assert_eq!(decode_expand_sz(raw_data).unwrap(), r"C:\Users\alice");
    }

    #[test]
    fn indented_line_without_wrap_marker_stays_separate() {
        let text = concat!(
            "[A]\r\n",
            "\"Flags\"=dword:00000000\r\n",
            "  00,61,00\r\n",
            "\"Guid\"=\"{GUID-X}\"\r\n",
        );
        let v = parse_export(text).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(
            v[1],
            RegistryEntry::ValueLine {
                name: "Flags".into(),
                raw_data: "dword:00000000".into()
            }
        );
        assert!(matches!(&v[2], RegistryEntry::ValueLine { name, .. } if name == "Guid"));
    }

    #[test]
    fn empty_and_unreadable_are_distinct() {
        assert_eq!(parse_export(""), Err(ParseError::Empty));
        assert_eq!(parse_export("\r\n  \n"), Err(ParseError::Empty));
        assert_eq!(
            parse_export("garbage\nmore garbage\n"),
            Err(ParseError::Unrecognized { lines: 2 })
        );
    }

    #[test]
    fn signature_only_is_nothing_found() {
        assert_eq!(parse_export("REGEDIT4\n").unwrap(), vec![]);
    }

    #[test]
    fn unknown_lines_are_skipped() {
        let v = parse_export("[A]\n; comment\n@=\"x\"\n\"v\"=\"1\"\n").unwrap();
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn escaped_quotes_in_names() {
        let v = parse_export("[A]\n\"a\\\"b\"=\"1\"\n").unwrap();
        assert_eq!(
            v[1],
            RegistryEntry::ValueLine {
                name: "a\"b".into(),
                raw_data: "\"1\"".into()
            }
        );
    }

    #[test]
    fn iterator_is_lazy() {
        let mut it = entries("[A]\n[B]\n");
        assert!(matches!(it.next(), Some(RegistryEntry::KeyHeader { .. })));
        assert_eq!(it.seen(), 1);
    }

    #[test]
    fn utf16_export_bytes() {
        let text = "REGEDIT4\r\n[A]\r\n";
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(text.encode_utf16().flat_map(|u| u.to_le_bytes()));
        assert_eq!(decode_export_bytes(&bytes).unwrap(), text);
        assert_eq!(decode_export_bytes(text.as_bytes()).unwrap(), text);
    }
}
