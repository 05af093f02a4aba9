use std::collections::hash_map::Entry;
use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::record::{ChangeContent, ChangeContext, ChangeKind, ChangeRecord};

/// One parsed key with its literal value and the 1-based line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// Path-like identifier addressing the key, dotted for nesting
    pub path: String,
    /// The value exactly as written in the source
    pub value: String,
    /// 1-based line of the value in the source
    pub line: usize,
}

/// Scan a JSON document into an ordered sequence of key paths and literal values.
///
/// Values keep their source spelling: strings keep their quotes, numbers and
/// keywords are captured verbatim. Nested keys are addressed with dotted
/// paths, array elements by numeric index. Empty input yields no pairs;
/// anything unparsable is an error so the caller can fall back to a line diff.
pub fn scan_json(text: &str) -> Result<Vec<KeyValue>> {
    let mut scanner = JsonScanner::new(text);
    scanner.skip_whitespace();
    if scanner.peek().is_none() {
        return Ok(Vec::new());
    }
    if !matches!(scanner.peek(), Some('{') | Some('[')) {
        bail!("top level is not an object or array");
    }

    let mut pairs = Vec::new();
    scanner.parse_value("", &mut pairs)?;
    scanner.skip_whitespace();
    if let Some(ch) = scanner.peek() {
        bail!("unexpected trailing content '{}' on line {}", ch, scanner.line);
    }
    Ok(pairs)
}

struct JsonScanner<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> JsonScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0, line: 1 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
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

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.advance() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => bail!("expected '{}' but found '{}' on line {}", expected, ch, self.line),
            None => bail!("expected '{}' but input ended", expected),
        }
    }

    fn parse_value(&mut self, path: &str, out: &mut Vec<KeyValue>) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_object(path, out),
            Some('[') => self.parse_array(path, out),
            Some(_) => {
                let line = self.line;
                let value = self.scalar_literal()?;
                out.push(KeyValue {
                    path: path.to_string(),
                    value,
                    line,
                });
                Ok(())
            }
            None => bail!("expected a value but input ended"),
        }
    }

    fn parse_object(&mut self, path: &str, out: &mut Vec<KeyValue>) -> Result<()> {
        self.expect('{')?;
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.advance();
            return Ok(());
        }
        loop {
            self.skip_whitespace();
            let key = self.quoted_key()?;
            self.skip_whitespace();
            self.expect(':')?;
            let child = join_path(path, &key);
            self.parse_value(&child, out)?;
            self.skip_whitespace();
            match self.advance() {
                Some(',') => continue,
                Some('}') => return Ok(()),
                Some(ch) => bail!("expected ',' or '}}' but found '{}' on line {}", ch, self.line),
                None => bail!("unterminated object"),
            }
        }
    }

    fn parse_array(&mut self, path: &str, out: &mut Vec<KeyValue>) -> Result<()> {
        self.expect('[')?;
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.advance();
            return Ok(());
        }
        let mut index = 0usize;
        loop {
            let child = join_path(path, &index.to_string());
            self.parse_value(&child, out)?;
            index += 1;
            self.skip_whitespace();
            match self.advance() {
                Some(',') => continue,
                Some(']') => return Ok(()),
                Some(ch) => bail!("expected ',' or ']' but found '{}' on line {}", ch, self.line),
                None => bail!("unterminated array"),
            }
        }
    }

    fn quoted_key(&mut self) -> Result<String> {
        if self.peek() != Some('"') {
            bail!("expected a quoted key on line {}", self.line);
        }
        let literal = self.string_literal()?;
        Ok(literal[1..literal.len() - 1].to_string())
    }

    /// Consume a string and return it with its quotes intact
    fn string_literal(&mut self) -> Result<String> {
        let start = self.pos;
        let line = self.line;
        self.expect('"')?;
        loop {
            match self.advance() {
                Some('\\') => {
                    self.advance();
                }
                Some('"') => return Ok(self.text[start..self.pos].to_string()),
                Some(_) => {}
                None => bail!("unterminated string starting on line {}", line),
            }
        }
    }

    fn scalar_literal(&mut self) -> Result<String> {
        if self.peek() == Some('"') {
            return self.string_literal();
        }
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if matches!(ch, ',' | '}' | ']') || ch.is_whitespace() {
                break;
            }
            self.advance();
        }
        if self.pos == start {
            bail!("expected a value on line {}", self.line);
        }
        Ok(self.text[start..self.pos].to_string())
    }
}

fn join_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}

/// Scan a flat key-value format (properties, env, ini style) line by line.
///
/// Comment and blank lines are skipped, `[section]` headers prefix the keys
/// that follow, and anything that does not look like `key = value` or
/// `key: value` is ignored.
pub fn scan_flat(text: &str) -> Vec<KeyValue> {
    let mut pairs = Vec::new();
    let mut section: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with(';')
            || line.starts_with('!')
        {
            continue;
        }
        if let Some(inner) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            let name = inner.trim();
            section = if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            };
            continue;
        }
        if let Some((key, value)) = split_kv(line) {
            let path = match &section {
                Some(prefix) => format!("{}.{}", prefix, key),
                None => key,
            };
            pairs.push(KeyValue {
                path,
                value,
                line: index + 1,
            });
        }
    }

    pairs
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

/// Split `key = value` / `key: value` with an optionally quoted key
pub(crate) fn split_kv(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let key_len = rest.find(|ch: char| !is_key_char(ch)).unwrap_or(rest.len());
    if key_len == 0 {
        return None;
    }
    let key = &rest[..key_len];
    let tail = &rest[key_len..];
    let tail = tail.strip_prefix('"').unwrap_or(tail);
    let tail = tail.trim_start();
    let tail = tail.strip_prefix(':').or_else(|| tail.strip_prefix('='))?;
    let value = tail.trim();
    if value.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Split a JSON-style `"key": value` pair, requiring the quotes and colon
pub(crate) fn split_json_pair(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix('"')?;
    let key_len = rest.find(|ch: char| !is_key_char(ch)).unwrap_or(rest.len());
    if key_len == 0 {
        return None;
    }
    let key = &rest[..key_len];
    let tail = rest[key_len..].strip_prefix('"')?;
    let tail = tail.trim_start().strip_prefix(':')?;
    let value = tail.trim();
    if value.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Match a single line as a key-value pair, JSON style first, then generic.
/// Trailing commas are dropped from the value.
pub(crate) fn match_kv_line(line: &str) -> Option<(String, String)> {
    let (key, value) = split_json_pair(line).or_else(|| split_kv(line))?;
    let value = value.trim_end_matches(',').trim_end().to_string();
    if value.is_empty() {
        return None;
    }
    Some((key, value))
}

struct Keyed<'a> {
    value: &'a str,
    line: usize,
}

/// Index pairs by path: first occurrence fixes the ordering position,
/// a later duplicate overrides the value and line.
fn index_pairs<'a>(pairs: &'a [KeyValue]) -> (Vec<&'a str>, HashMap<&'a str, Keyed<'a>>) {
    let mut order: Vec<&str> = Vec::new();
    let mut map: HashMap<&str, Keyed> = HashMap::new();
    for pair in pairs {
        match map.entry(pair.path.as_str()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.value = &pair.value;
                entry.line = pair.line;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Keyed {
                    value: &pair.value,
                    line: pair.line,
                });
                order.push(&pair.path);
            }
        }
    }
    (order, map)
}

/// Diff two parsed key-value sequences into change records.
///
/// A key only in the new version becomes an insert, only in the old version a
/// delete, and differing values a replace. Identical values emit nothing.
/// Records are ordered by their anchor line, new version first.
pub fn kv_changes(
    file: &str,
    context: ChangeContext,
    old_pairs: &[KeyValue],
    new_pairs: &[KeyValue],
) -> Vec<ChangeRecord> {
    let (new_order, new_map) = index_pairs(new_pairs);
    let (old_order, old_map) = index_pairs(old_pairs);

    let mut records = Vec::new();

    for path in &new_order {
        let Some(new_entry) = new_map.get(path) else {
            continue;
        };
        match old_map.get(path) {
            Some(old_entry) if old_entry.value == new_entry.value => {}
            Some(old_entry) => records.push(keyed_record(
                file,
                context,
                path,
                Some((old_entry.value, old_entry.line)),
                Some((new_entry.value, new_entry.line)),
            )),
            None => records.push(keyed_record(
                file,
                context,
                path,
                None,
                Some((new_entry.value, new_entry.line)),
            )),
        }
    }

    for path in &old_order {
        if new_map.contains_key(path) {
            continue;
        }
        let Some(old_entry) = old_map.get(path) else {
            continue;
        };
        records.push(keyed_record(
            file,
            context,
            path,
            Some((old_entry.value, old_entry.line)),
            None,
        ));
    }

    records.sort_by_key(|record| record.line_new.or(record.line_old).unwrap_or(0));

    records
}

fn keyed_record(
    file: &str,
    context: ChangeContext,
    property: &str,
    old: Option<(&str, usize)>,
    new: Option<(&str, usize)>,
) -> ChangeRecord {
    let change_type = match (&old, &new) {
        (Some(_), Some(_)) => ChangeKind::Replace,
        (None, Some(_)) => ChangeKind::Insert,
        _ => ChangeKind::Delete,
    };
    let property = property.to_string();
    let old_value = old.map(|(value, _)| value.to_string());
    let new_value = new.map(|(value, _)| value.to_string());
    let content = match context {
        ChangeContext::PlistKv => ChangeContent::PlistKv {
            property,
            old: old_value,
            new: new_value,
        },
        _ => ChangeContent::Kv {
            property,
            old: old_value,
            new: new_value,
        },
    };
    ChangeRecord {
        file: file.to_string(),
        content,
        change_type,
        line_old: old.map(|(_, line)| line),
        line_new: new.map(|(_, line)| line),
        commit: None,
    }
}
