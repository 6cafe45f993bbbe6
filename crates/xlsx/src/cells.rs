//! Cell references and cell values.

use docref_ooxml::XmlElement;

/// Column letters for a 0-based column index (0 → `A`, 26 → `AA`).
pub fn column_name(col: u32) -> String {
    let mut name = String::new();
    let mut n = u64::from(col) + 1;
    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    name
}

/// 0-based column index for column letters.
pub fn column_index(name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for ch in name.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return None;
        }
        result = result.checked_mul(26)?.checked_add(ch as u32 - 'A' as u32 + 1)?;
    }
    Some(result - 1)
}

/// `A1` reference for 0-based row and column.
pub fn cell_reference(row: u32, col: u32) -> String {
    format!("{}{}", column_name(col), u64::from(row) + 1)
}

/// 0-based `(row, col)` of an `A1` reference; `$` markers are ignored.
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = column_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col))
}

/// The workbook's shared string table.
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    pub fn parse(root: &XmlElement) -> Self {
        Self {
            strings: root.children_named("si").map(rich_text).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Text of an `si`/`is` element: plain `t` or rich-text runs, without
/// phonetic hints.
fn rich_text(element: &XmlElement) -> String {
    let mut text = String::new();
    for child in element.elements() {
        match child.name.as_str() {
            "t" => text.push_str(&child.text()),
            "r" => {
                if let Some(t) = child.child("t") {
                    text.push_str(&t.text());
                }
            }
            _ => {}
        }
    }
    text
}

/// Displayed value of a `c` element, using cached formula results.
pub fn cell_value(cell: &XmlElement, shared: &SharedStrings) -> Option<String> {
    let raw = || cell.child("v").map(|v| v.text());

    match cell.attr_local("t").unwrap_or("n") {
        "s" => {
            let index: usize = raw()?.trim().parse().ok()?;
            shared.get(index).map(str::to_string)
        }
        "inlineStr" => cell.child("is").map(rich_text),
        "b" => raw().map(|v| {
            if v.trim() == "1" {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }),
        "n" => raw().map(|v| format_number(&v)),
        _ => raw(),
    }
}

/// Numbers as written by a spreadsheet: integers without a fraction.
fn format_number(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(int) = raw.parse::<i64>() {
        return int.to_string();
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
            (value as i64).to_string()
        }
        Ok(value) if value.is_finite() => value.to_string(),
        _ => raw.to_string(),
    }
}
