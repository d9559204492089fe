//! INI file lookup with `RawConfigParser`-style rules.
//!
//! Supported grammar:
//! - `[section]` headers; section names are case-sensitive
//! - `key = value` or `key: value`; option names are case-insensitive
//! - whole-line comments starting with `#` or `;`
//! - indented lines continue the previous value, joined with `\n`
//! - options in `[DEFAULT]` are visible from every section
//!
//! No interpolation is performed and inline comments are kept as part of
//! the value.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::{DgmError, Result};

/// Section whose options every other section inherits.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Encoding assumed when the caller does not name one.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Text encodings accepted by [`IniFile::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, with an optional byte-order mark.
    Utf8,
    /// ISO-8859-1.
    Latin1,
}

impl Encoding {
    /// Resolve an encoding label such as `UTF-8`, `utf8`, `latin-1` or
    /// `ISO-8859-1`.
    pub fn from_label(label: &str) -> Result<Self> {
        let key: String = label
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "utf8" => Ok(Self::Utf8),
            "latin1" | "iso88591" | "l1" => Ok(Self::Latin1),
            _ => Err(DgmError::UnsupportedEncoding {
                encoding: label.to_string(),
            }),
        }
    }

    fn decode(self, bytes: Vec<u8>, path: &Path) -> Result<String> {
        match self {
            Self::Utf8 => {
                let text = String::from_utf8(bytes).map_err(|_| DgmError::Decode {
                    path: path.to_path_buf(),
                    encoding: "UTF-8".to_string(),
                })?;
                match text.strip_prefix('\u{feff}') {
                    Some(rest) => Ok(rest.to_string()),
                    None => Ok(text),
                }
            }
            // Latin-1 maps every byte to the code point of the same value.
            Self::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

/// A parsed INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    defaults: BTreeMap<String, String>,
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

struct LineGrammar {
    section: Regex,
    option: Regex,
}

/// Compiled once per process.
static GRAMMAR: LazyLock<std::result::Result<LineGrammar, regex::Error>> =
    LazyLock::new(|| {
        Ok(LineGrammar {
            section: Regex::new(r"^\[(?P<name>.+)\]\s*$")?,
            option: Regex::new(r"^(?P<key>[^=:]*?)\s*[=:]\s*(?P<value>.*)$")?,
        })
    });

impl LineGrammar {
    fn get() -> Result<&'static Self> {
        GRAMMAR.as_ref().map_err(|err| DgmError::Runtime {
            details: format!("INI grammar: {err}"),
        })
    }
}

impl IniFile {
    /// Parse INI text. `origin` only labels errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let grammar = LineGrammar::get()?;
        let mut ini = Self::default();
        let mut current: Option<String> = None;
        let mut last_key: Option<String> = None;

        let fail = |line: usize, details: String| DgmError::IniParse {
            path: origin.to_path_buf(),
            line,
            details,
        };

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = raw.starts_with(char::is_whitespace);
            if indented
                && let (Some(section), Some(key)) = (&current, &last_key)
            {
                let values = ini.section_mut(section);
                if let Some(value) = values.get_mut(key) {
                    value.push('\n');
                    value.push_str(trimmed);
                }
                continue;
            }

            if let Some(caps) = grammar.section.captures(trimmed) {
                let name = caps["name"].to_string();
                if name != DEFAULT_SECTION && ini.sections.contains_key(&name) {
                    return Err(fail(line_no, format!("duplicate section {name:?}")));
                }
                if name != DEFAULT_SECTION {
                    ini.sections.insert(name.clone(), BTreeMap::new());
                }
                current = Some(name);
                last_key = None;
                continue;
            }

            let Some(section) = &current else {
                return Err(fail(line_no, "option found before any section header".into()));
            };

            let Some(caps) = grammar.option.captures(trimmed) else {
                return Err(fail(line_no, format!("cannot parse line {trimmed:?}")));
            };
            let key = caps["key"].trim().to_lowercase();
            if key.is_empty() {
                return Err(fail(line_no, "empty option name".into()));
            }

            let values = ini.section_mut(section);
            if values.contains_key(&key) {
                return Err(fail(line_no, format!("duplicate option {key:?}")));
            }
            values.insert(key.clone(), caps["value"].trim().to_string());
            last_key = Some(key);
        }

        Ok(ini)
    }

    /// Read and parse `path` with the given encoding label.
    pub fn load(path: &Path, encoding: &str) -> Result<Self> {
        let encoding = Encoding::from_label(encoding)?;
        let bytes = fs::read(path).map_err(|source| DgmError::io(path, source))?;
        let text = encoding.decode(bytes, path)?;
        Self::parse(&text, path)
    }

    /// Value of `option` in `section`, falling back to `[DEFAULT]`.
    ///
    /// Returns `None` when the section does not exist (other than
    /// `DEFAULT`) or neither place defines the option.
    #[must_use]
    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        let key = option.to_lowercase();
        if section != DEFAULT_SECTION {
            let values = self.sections.get(section)?;
            if let Some(value) = values.get(&key) {
                return Some(value.as_str());
            }
        }
        self.defaults.get(&key).map(String::as_str)
    }

    /// Section names in sorted order, excluding `DEFAULT`.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Whether `[section]` was declared. `DEFAULT` never counts.
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    fn section_mut(&mut self, section: &str) -> &mut BTreeMap<String, String> {
        if section == DEFAULT_SECTION {
            &mut self.defaults
        } else {
            self.sections.entry(section.to_string()).or_default()
        }
    }
}

/// Look up `option` in `section` of the INI file at `path`.
///
/// A missing file, section or option yields `default`. Unknown encodings,
/// undecodable content and malformed files are errors.
pub fn get_ini_value(
    path: &Path,
    section: &str,
    option: &str,
    default: &str,
    encoding: &str,
) -> Result<String> {
    let ini = match IniFile::load(path, encoding) {
        Ok(ini) => ini,
        Err(DgmError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            return Ok(default.to_string());
        }
        Err(e) => return Err(e),
    };
    Ok(ini
        .get(section, option)
        .map_or_else(|| default.to_string(), str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# connection settings
[DEFAULT]
timeout = 30
owner: ops

[database]
Host = db.local
port: 1521
query = select *
    from dual
; trailing comment

[paths]
timeout = 5
";

    fn sample() -> IniFile {
        IniFile::parse(SAMPLE, Path::new("sample.ini")).unwrap()
    }

    #[test]
    fn reads_both_separators() {
        let ini = sample();
        assert_eq!(ini.get("database", "host"), Some("db.local"));
        assert_eq!(ini.get("database", "port"), Some("1521"));
    }

    #[test]
    fn option_names_are_case_insensitive() {
        let ini = sample();
        assert_eq!(ini.get("database", "HOST"), Some("db.local"));
        assert_eq!(ini.get("database", "Host"), Some("db.local"));
    }

    #[test]
    fn section_names_are_case_sensitive() {
        assert_eq!(sample().get("DATABASE", "host"), None);
    }

    #[test]
    fn continuation_lines_join_with_newline() {
        assert_eq!(
            sample().get("database", "query"),
            Some("select *\nfrom dual")
        );
    }

    #[test]
    fn default_section_is_inherited_and_overridable() {
        let ini = sample();
        assert_eq!(ini.get("database", "timeout"), Some("30"));
        assert_eq!(ini.get("paths", "timeout"), Some("5"));
        assert_eq!(ini.get("paths", "owner"), Some("ops"));
        assert_eq!(ini.get(DEFAULT_SECTION, "owner"), Some("ops"));
        assert_eq!(ini.get("missing", "owner"), None);
    }

    #[test]
    fn sections_exclude_default() {
        let ini = sample();
        let names: Vec<&str> = ini.sections().collect();
        assert_eq!(names, vec!["database", "paths"]);
        assert!(ini.has_section("paths"));
        assert!(!ini.has_section(DEFAULT_SECTION));
    }

    #[test]
    fn option_before_header_is_error() {
        let err = IniFile::parse("key = v\n", Path::new("x.ini")).unwrap_err();
        assert_eq!(err.code(), "DGM-2001");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn garbage_line_is_error() {
        let err = IniFile::parse("[a]\nnot an option\n", Path::new("x.ini")).unwrap_err();
        assert!(matches!(err, DgmError::IniParse { line: 2, .. }));
    }

    #[test]
    fn duplicate_option_is_error() {
        let err = IniFile::parse("[a]\nk = 1\nK = 2\n", Path::new("x.ini")).unwrap_err();
        assert!(err.to_string().contains("duplicate option"));
    }

    #[test]
    fn get_ini_value_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.ini");
        fs::write(&path, SAMPLE).unwrap();

        assert_eq!(
            get_ini_value(&path, "database", "port", "", DEFAULT_ENCODING).unwrap(),
            "1521"
        );
        assert_eq!(
            get_ini_value(&path, "database", "user", "scott", DEFAULT_ENCODING).unwrap(),
            "scott"
        );
        assert_eq!(
            get_ini_value(&path, "nope", "port", "x", DEFAULT_ENCODING).unwrap(),
            "x"
        );
        assert_eq!(
            get_ini_value(&dir.path().join("absent.ini"), "a", "b", "d", "utf-8").unwrap(),
            "d"
        );
    }

    #[test]
    fn latin1_files_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.ini");
        fs::write(&path, b"[pt]\nmes = mar\xe7o\n").unwrap();

        assert_eq!(
            get_ini_value(&path, "pt", "mes", "", "latin-1").unwrap(),
            "março"
        );
        assert_eq!(
            get_ini_value(&path, "pt", "mes", "", "ISO-8859-1").unwrap(),
            "março"
        );
        let err = get_ini_value(&path, "pt", "mes", "", "UTF-8").unwrap_err();
        assert_eq!(err.code(), "DGM-2003");
    }

    #[test]
    fn unknown_encoding_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = get_ini_value(&dir.path().join("a.ini"), "a", "b", "", "EBCDIC").unwrap_err();
        assert_eq!(err.code(), "DGM-2002");
    }

    #[test]
    fn bom_is_ignored() {
        let text = "\u{feff}[a]\nk = v\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.ini");
        fs::write(&path, text).unwrap();
        assert_eq!(IniFile::load(&path, "utf8").unwrap().get("a", "k"), Some("v"));
    }

    #[test]
    fn grammar_is_compiled_once_and_shared() {
        let first = LineGrammar::get().unwrap();
        let second = LineGrammar::get().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(first.section.is_match("[database]"));
        assert!(first.option.is_match("port: 1521"));
    }
}
