//! Small text and date formatting helpers shared by the logger and the CLI.

use chrono::{Datelike, NaiveDate};

/// Width of one indentation block.
pub const INDENT_SIZE: usize = 4;

/// Default timestamp layout for log records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Prefix `text` with `indent_level` blocks of [`INDENT_SIZE`] spaces.
#[must_use]
pub fn indent_text(text: &str, indent_level: usize) -> String {
    let mut out = String::with_capacity(indent_level * INDENT_SIZE + text.len());
    for _ in 0..indent_level {
        out.push_str(&" ".repeat(INDENT_SIZE));
    }
    out.push_str(text);
    out
}

/// Insert `separator` after every character of `text`, trimming trailing
/// whitespace from the result.
///
/// `space_text("DGM", " ")` yields `"D G M"`.
#[must_use]
pub fn space_text(text: &str, separator: &str) -> String {
    let mut out = String::with_capacity(text.len() * (1 + separator.len()));
    for ch in text.chars() {
        out.push(ch);
        out.push_str(separator);
    }
    out.trim_end().to_string()
}

/// Local wall-clock time rendered with a `strftime`-style layout.
#[must_use]
pub fn now(fmt: &str) -> String {
    chrono::Local::now().format(fmt).to_string()
}

/// Upper-case Portuguese (pt-BR) month name.
#[must_use]
pub fn month_name_pt(date: NaiveDate) -> &'static str {
    match date.month() {
        1 => "JANEIRO",
        2 => "FEVEREIRO",
        3 => "MARÇO",
        4 => "ABRIL",
        5 => "MAIO",
        6 => "JUNHO",
        7 => "JULHO",
        8 => "AGOSTO",
        9 => "SETEMBRO",
        10 => "OUTUBRO",
        11 => "NOVEMBRO",
        12 => "DEZEMBRO",
        _ => "INVALID_MONTH",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_uses_four_space_blocks() {
        assert_eq!(indent_text("x", 0), "x");
        assert_eq!(indent_text("x", 2), "        x");
        assert_eq!(indent_text("", 1), "    ");
    }

    #[test]
    fn space_text_interleaves_and_trims() {
        assert_eq!(space_text("DGM LIB", " "), "D G M   L I B");
        assert_eq!(space_text("ab", "-"), "a-b-");
        assert_eq!(space_text("", " "), "");
    }

    #[test]
    fn now_honours_layout() {
        let stamp = now(TIMESTAMP_FORMAT);
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[13..14], ":");
    }

    #[test]
    fn month_names() {
        let march = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        let december = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert_eq!(month_name_pt(march), "MARÇO");
        assert_eq!(month_name_pt(december), "DEZEMBRO");
    }
}
