use anyhow::{bail, Result};

use crate::kv::KeyValue;
use crate::record::{ChangeContent, ChangeRecord};

/// How far above a changed line to look for its governing `<key>`
const KEY_SEARCH_BACK: usize = 20;

/// Scan plist-style XML into an ordered sequence of key paths and values.
///
/// Dict keys nest with dots, array elements use numeric indices. String
/// values are entity-unescaped, `<true/>`/`<false/>` become `true`/`false`,
/// and the remaining scalar elements keep their inner text. Malformed markup
/// is an error so the caller can fall back to a line diff.
pub fn scan_plist(text: &str) -> Result<Vec<KeyValue>> {
    let mut scanner = PlistScanner::new(text);
    scanner.skip_whitespace();
    if scanner.at_end() {
        return Ok(Vec::new());
    }

    let mut pairs = Vec::new();
    let first = scanner.next_tag()?;
    if first.name == "plist" {
        if first.kind == TagKind::Open {
            let tag = scanner.next_tag()?;
            if !(tag.kind == TagKind::Close && tag.name == "plist") {
                scanner.parse_value(tag, "", &mut pairs)?;
                let close = scanner.next_tag()?;
                if !(close.kind == TagKind::Close && close.name == "plist") {
                    bail!("expected </plist> on line {}", close.line);
                }
            }
        }
    } else {
        // tolerate documents without the <plist> wrapper
        scanner.parse_value(first, "", &mut pairs)?;
    }

    scanner.skip_whitespace();
    if !scanner.at_end() {
        bail!("unexpected trailing content on line {}", scanner.line);
    }
    Ok(pairs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    SelfClose,
}

struct Tag {
    name: String,
    kind: TagKind,
    line: usize,
}

struct PlistScanner<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> PlistScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0, line: 1 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }
    }

    fn skip_past(&mut self, pattern: &str) -> Result<()> {
        match self.rest().find(pattern) {
            Some(offset) => {
                let end = self.pos + offset + pattern.len();
                while self.pos < end {
                    self.advance();
                }
                Ok(())
            }
            None => bail!("unterminated markup on line {}", self.line),
        }
    }

    /// Read the next element tag, skipping prolog, doctype and comments
    fn next_tag(&mut self) -> Result<Tag> {
        loop {
            self.skip_whitespace();
            let line = self.line;
            match self.advance() {
                Some('<') => {
                    if self.rest().starts_with("!--") {
                        self.skip_past("-->")?;
                        continue;
                    }
                    if matches!(self.peek(), Some('!') | Some('?')) {
                        self.skip_past(">")?;
                        continue;
                    }
                    let closing = if self.peek() == Some('/') {
                        self.advance();
                        true
                    } else {
                        false
                    };
                    let name_start = self.pos;
                    while matches!(self.peek(), Some(ch) if ch.is_ascii_alphanumeric()) {
                        self.advance();
                    }
                    let name = self.text[name_start..self.pos].to_string();
                    if name.is_empty() {
                        bail!("malformed tag on line {}", line);
                    }
                    let mut self_closing = false;
                    loop {
                        match self.advance() {
                            Some('>') => break,
                            Some('/') if self.peek() == Some('>') => self_closing = true,
                            Some('"') => {
                                while !matches!(self.advance(), Some('"') | None) {}
                            }
                            Some(_) => {}
                            None => bail!("unterminated tag on line {}", line),
                        }
                    }
                    let kind = if closing {
                        TagKind::Close
                    } else if self_closing {
                        TagKind::SelfClose
                    } else {
                        TagKind::Open
                    };
                    return Ok(Tag { name, kind, line });
                }
                Some(ch) => bail!("unexpected content '{}' on line {}", ch, self.line),
                None => bail!("unexpected end of input"),
            }
        }
    }

    /// Consume text up to the matching closing tag and return it
    fn element_text(&mut self, name: &str) -> Result<String> {
        let start = self.pos;
        let Some(offset) = self.rest().find('<') else {
            bail!("unterminated <{}> element", name);
        };
        let end = self.pos + offset;
        while self.pos < end {
            self.advance();
        }
        let text = self.text[start..end].to_string();
        let close = self.next_tag()?;
        if !(close.kind == TagKind::Close && close.name == name) {
            bail!("expected </{}> on line {}", name, close.line);
        }
        Ok(text)
    }

    fn parse_value(&mut self, tag: Tag, path: &str, out: &mut Vec<KeyValue>) -> Result<()> {
        match (tag.name.as_str(), tag.kind) {
            ("dict", TagKind::Open) => self.parse_dict(path, out),
            ("array", TagKind::Open) => self.parse_array(path, out),
            ("dict", TagKind::SelfClose) | ("array", TagKind::SelfClose) => Ok(()),
            ("true", TagKind::SelfClose) => {
                out.push(pair(path, "true".to_string(), tag.line));
                Ok(())
            }
            ("false", TagKind::SelfClose) => {
                out.push(pair(path, "false".to_string(), tag.line));
                Ok(())
            }
            ("string", TagKind::Open) => {
                let text = self.element_text("string")?;
                out.push(pair(path, unescape_entities(text.trim()), tag.line));
                Ok(())
            }
            ("string", TagKind::SelfClose) => {
                out.push(pair(path, String::new(), tag.line));
                Ok(())
            }
            ("integer", TagKind::Open)
            | ("real", TagKind::Open)
            | ("date", TagKind::Open)
            | ("data", TagKind::Open) => {
                let text = self.element_text(&tag.name)?;
                out.push(pair(path, text.trim().to_string(), tag.line));
                Ok(())
            }
            (name, TagKind::Close) => bail!("unexpected </{}> on line {}", name, tag.line),
            (name, _) => bail!("unsupported plist element <{}> on line {}", name, tag.line),
        }
    }

    fn parse_dict(&mut self, path: &str, out: &mut Vec<KeyValue>) -> Result<()> {
        loop {
            let tag = self.next_tag()?;
            match (tag.name.as_str(), tag.kind) {
                ("dict", TagKind::Close) => return Ok(()),
                ("key", TagKind::Open) => {
                    let key = self.element_text("key")?.trim().to_string();
                    let child = if path.is_empty() {
                        key
                    } else {
                        format!("{}.{}", path, key)
                    };
                    let value_tag = self.next_tag()?;
                    self.parse_value(value_tag, &child, out)?;
                }
                ("key", TagKind::SelfClose) => {
                    let value_tag = self.next_tag()?;
                    self.parse_value(value_tag, path, out)?;
                }
                (name, _) => bail!("expected <key> in dict, found <{}> on line {}", name, tag.line),
            }
        }
    }

    fn parse_array(&mut self, path: &str, out: &mut Vec<KeyValue>) -> Result<()> {
        let mut index = 0usize;
        loop {
            let tag = self.next_tag()?;
            if tag.name == "array" && tag.kind == TagKind::Close {
                return Ok(());
            }
            let child = if path.is_empty() {
                index.to_string()
            } else {
                format!("{}.{}", path, index)
            };
            self.parse_value(tag, &child, out)?;
            index += 1;
        }
    }
}

fn pair(path: &str, value: String, line: usize) -> KeyValue {
    KeyValue {
        path: path.to_string(),
        value,
        line,
    }
}

/// Enrich block records from a degraded plist diff.
///
/// Single-line `<string>` edits get their governing `<key>` looked up in the
/// surrounding content (searching upward first, then a few lines forward) and
/// become plist-kv records. Everything else passes through unchanged.
pub(crate) fn annotate_block_records(
    records: Vec<ChangeRecord>,
    old_text: &str,
    new_text: &str,
) -> Vec<ChangeRecord> {
    let old_file_lines: Vec<&str> = old_text.lines().collect();
    let new_file_lines: Vec<&str> = new_text.lines().collect();

    records
        .into_iter()
        .map(|record| annotate_record(record, &old_file_lines, &new_file_lines))
        .collect()
}

fn annotate_record(
    record: ChangeRecord,
    old_file_lines: &[&str],
    new_file_lines: &[&str],
) -> ChangeRecord {
    let ChangeContent::Block {
        old_lines,
        new_lines,
    } = &record.content
    else {
        return record;
    };
    if old_lines.len() > 1 || new_lines.len() > 1 {
        return record;
    }

    let old_value = old_lines.first().and_then(|line| string_payload(line));
    let new_value = new_lines.first().and_then(|line| string_payload(line));
    if old_value.is_none() && new_value.is_none() {
        return record;
    }
    // every present side must be a recognizable <string> line
    if (!old_lines.is_empty() && old_value.is_none())
        || (!new_lines.is_empty() && new_value.is_none())
    {
        return record;
    }

    let (file_lines, anchor) = match (record.line_new, record.line_old) {
        (Some(line), _) => (new_file_lines, line),
        (None, Some(line)) => (old_file_lines, line),
        (None, None) => return record,
    };
    let Some(key) = find_key_near(file_lines, anchor) else {
        return record;
    };

    ChangeRecord {
        content: ChangeContent::PlistKv {
            property: key,
            old: old_value,
            new: new_value,
        },
        ..record
    }
}

/// Search upward from the line above `anchor_line` for a `<key>`, then fall
/// back to the anchor line and the three lines after it
fn find_key_near(lines: &[&str], anchor_line: usize) -> Option<String> {
    let mut i = anchor_line.saturating_sub(2);
    let lo = i.saturating_sub(KEY_SEARCH_BACK);
    loop {
        if let Some(key) = lines.get(i).and_then(|line| key_in_line(line)) {
            return Some(key);
        }
        if i == lo {
            break;
        }
        i -= 1;
    }

    let start = anchor_line.saturating_sub(1);
    let upper = (start + 3).min(lines.len().saturating_sub(1));
    for i in start..=upper {
        if let Some(key) = lines.get(i).and_then(|line| key_in_line(line)) {
            return Some(key);
        }
    }
    None
}

fn strip_open_tag<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    let s = s.strip_prefix('<')?;
    let s = s.trim_start();
    let s = s.strip_prefix(name)?;
    let s = s.trim_start();
    s.strip_prefix('>')
}

fn is_closing_tag(s: &str, name: &str) -> bool {
    let stripped = s
        .strip_prefix('<')
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix(name))
        .map(str::trim_start);
    matches!(stripped, Some(rest) if rest.starts_with('>'))
}

/// Extract the payload of a `<string>...</string>` line, entity-unescaped
fn string_payload(line: &str) -> Option<String> {
    let s = line.trim();
    let rest = strip_open_tag(s, "string")?;
    let inner_end = rest.find('<')?;
    if !is_closing_tag(&rest[inner_end..], "string") {
        return None;
    }
    Some(unescape_entities(rest[..inner_end].trim()))
}

/// Find a non-empty `<key>...</key>` anywhere in the line
fn key_in_line(line: &str) -> Option<String> {
    for (idx, _) in line.match_indices('<') {
        let Some(tail) = strip_open_tag(&line[idx..], "key") else {
            continue;
        };
        let Some(end) = tail.find('<') else {
            continue;
        };
        if !is_closing_tag(&tail[end..], "key") {
            continue;
        }
        let key = tail[..end].trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }
    None
}

/// Decode the predefined XML entities and numeric character references
fn unescape_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        match tail.find(';') {
            Some(end) if end <= 10 => {
                match decode_entity(&tail[1..end]) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = entity.strip_prefix('#')?;
            let value = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleName</key>
    <string>Demo &amp; Friends</string>
    <key>CFBundleVersion</key>
    <integer>42</integer>
    <key>Flags</key>
    <dict>
        <key>Beta</key>
        <true/>
    </dict>
</dict>
</plist>
"#;

    #[test]
    fn test_scan_nested_dict_paths() {
        let pairs = scan_plist(SAMPLE).unwrap();

        let paths: Vec<&str> = pairs.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["CFBundleName", "CFBundleVersion", "Flags.Beta"]);
        assert_eq!(pairs[0].value, "Demo & Friends");
        assert_eq!(pairs[1].value, "42");
        assert_eq!(pairs[2].value, "true");
        assert_eq!(pairs[0].line, 6);
    }

    #[test]
    fn test_scan_array_uses_numeric_indices() {
        let text = "<plist version=\"1.0\"><dict><key>Items</key><array><string>a</string><string>b</string></array></dict></plist>";
        let pairs = scan_plist(text).unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].path, "Items.0");
        assert_eq!(pairs[1].path, "Items.1");
    }

    #[test]
    fn test_scan_rejects_mismatched_tags() {
        assert!(scan_plist("<plist><dict><key>A</key><string>x</dict></plist>").is_err());
        assert!(scan_plist("<plist><dict><string>x</string></dict></plist>").is_err());
    }

    #[test]
    fn test_scan_accepts_empty_input() {
        assert_eq!(scan_plist("").unwrap(), Vec::new());
        assert_eq!(scan_plist("  \n").unwrap(), Vec::new());
    }

    #[test]
    fn test_string_payload_tolerates_spaced_tags() {
        assert_eq!(string_payload("  <string>hello</string>"), Some("hello".to_string()));
        assert_eq!(string_payload("< string >hi< /string >"), Some("hi".to_string()));
        assert_eq!(string_payload("<integer>3</integer>"), None);
    }

    #[test]
    fn test_key_search_looks_back_then_forward() {
        let lines = vec!["<dict>", "<key>Color</key>", "<string>red</string>"];
        assert_eq!(find_key_near(&lines, 3), Some("Color".to_string()));

        let lines = vec!["<string>red</string>", "<key>Next</key>"];
        assert_eq!(find_key_near(&lines, 1), Some("Next".to_string()));
    }
}
