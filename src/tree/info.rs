//! INFO format reader and writer
//!
//! ```text
//! ; comment
//! name  validation_run
//! LFS   "/eos/cms/store/group/alca_trackeralign"
//! alignments
//! {
//!     A1
//!     {
//!         globaltag auto:phase1_2022_realistic
//!         color     kRed+1
//!     }
//! }
//! #include "validations.info"
//! ```
//!
//! A line holds a key, optional data, and optionally `{` / `}`. Quoted strings
//! take C escapes and may continue on the next line with a trailing `\`.
//! Unquoted data runs to the end of the line (or to `{`, `}`, `;`).

use std::path::{Path, PathBuf};

use crate::error::AllInOneError;

use super::ConfigTree;

/// Nesting limit for `#include`
const MAX_INCLUDE_DEPTH: usize = 16;

/// Parse INFO text. `source` only names the input in error messages;
/// relative `#include` paths resolve against the current directory.
pub fn read_info(text: &str, source: &str) -> Result<ConfigTree, AllInOneError> {
    let mut parser = Parser::new(source.to_string(), None, 0);
    parser.parse(text)
}

/// Parse an INFO file; `#include` paths resolve against its directory.
pub fn read_info_file(path: &Path) -> Result<ConfigTree, AllInOneError> {
    read_info_file_at_depth(path, 0)
}

fn read_info_file_at_depth(path: &Path, depth: usize) -> Result<ConfigTree, AllInOneError> {
    let text = std::fs::read_to_string(path).map_err(|_| AllInOneError::ConfigNotFound {
        path: path.to_path_buf(),
    })?;
    let base = path.parent().map(Path::to_path_buf);
    let mut parser = Parser::new(path.display().to_string(), base, depth);
    parser.parse(&text)
}

/// Serialize a tree to INFO text that parses back to an equal tree.
pub fn write_info(tree: &ConfigTree) -> String {
    let mut out = String::new();
    write_children(&mut out, tree, 0);
    out
}

/// Write `tree` to `path` as INFO.
pub fn write_info_file(tree: &ConfigTree, path: &Path) -> Result<(), AllInOneError> {
    std::fs::write(path, write_info(tree)).map_err(|source| AllInOneError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

// ═══════════════════════════════════════════════════════════════
// Reader
// ═══════════════════════════════════════════════════════════════

struct Parser {
    source: String,
    base: Option<PathBuf>,
    depth: usize,
    /// Open blocks; index 0 is the root
    stack: Vec<(String, ConfigTree)>,
    /// The last key read may still be opened by a `{`
    can_open: bool,
    /// The last quoted value ended with `\`
    continues: bool,
    line: usize,
}

impl Parser {
    fn new(source: String, base: Option<PathBuf>, depth: usize) -> Self {
        Self {
            source,
            base,
            depth,
            stack: vec![(String::new(), ConfigTree::new())],
            can_open: false,
            continues: false,
            line: 0,
        }
    }

    fn error(&self, details: impl Into<String>) -> AllInOneError {
        AllInOneError::InfoParse {
            file: self.source.clone(),
            line: self.line,
            details: details.into(),
        }
    }

    fn top(&mut self) -> &mut ConfigTree {
        let last = self.stack.len() - 1;
        &mut self.stack[last].1
    }

    fn parse(&mut self, text: &str) -> Result<ConfigTree, AllInOneError> {
        for (idx, raw) in text.lines().enumerate() {
            self.line = idx + 1;
            let chars: Vec<char> = raw.chars().collect();
            self.parse_line(&chars)?;
        }
        if self.continues {
            return Err(self.error("line continuation at end of input"));
        }
        if self.stack.len() > 1 {
            let open = self.stack.last().map(|(k, _)| k.clone()).unwrap_or_default();
            return Err(self.error(format!("unclosed block '{open}'")));
        }
        let (_, root) = self.stack.pop().unwrap_or_default();
        Ok(root)
    }

    fn parse_line(&mut self, chars: &[char]) -> Result<(), AllInOneError> {
        let mut pos = skip_ws(chars, 0);

        if self.continues {
            self.continues = false;
            if chars.get(pos) != Some(&'"') {
                return Err(self.error("expected a quoted string after '\\'"));
            }
            let (more, next) = self.quoted(chars, pos)?;
            if let Some((_, last)) = self.top().children.last_mut() {
                last.value.push_str(&more);
            }
            pos = self.after_quoted(chars, next)?;
        }

        if self.starts_with(chars, pos, "#include") {
            return self.include(chars, pos + "#include".len());
        }

        loop {
            pos = skip_ws(chars, pos);
            match chars.get(pos) {
                None | Some(';') => return Ok(()),
                Some('{') => {
                    self.open()?;
                    pos += 1;
                }
                Some('}') => {
                    self.close()?;
                    pos += 1;
                }
                Some(_) => {
                    if self.continues {
                        return Err(self.error("unexpected text after '\\'"));
                    }
                    pos = self.entry(chars, pos)?;
                }
            }
        }
    }

    /// Key plus optional data; returns the position after them.
    fn entry(&mut self, chars: &[char], pos: usize) -> Result<usize, AllInOneError> {
        let (key, mut pos) = if chars[pos] == '"' {
            self.quoted(chars, pos)?
        } else {
            bare_word(chars, pos)
        };

        pos = skip_ws(chars, pos);
        let value = match chars.get(pos) {
            None | Some(';') | Some('{') | Some('}') => String::new(),
            Some('"') => {
                let (value, next) = self.quoted(chars, pos)?;
                pos = self.after_quoted(chars, next)?;
                value
            }
            Some(_) => {
                let end = chars[pos..]
                    .iter()
                    .position(|c| matches!(c, ';' | '{' | '}'))
                    .map_or(chars.len(), |off| pos + off);
                let value: String = chars[pos..end].iter().collect();
                pos = end;
                value.trim().to_string()
            }
        };

        self.top().children.push((key, ConfigTree::with_value(value)));
        self.can_open = true;
        Ok(pos)
    }

    /// After a quoted value: a trailing `\` continues it on the next line.
    fn after_quoted(&mut self, chars: &[char], pos: usize) -> Result<usize, AllInOneError> {
        let pos = skip_ws(chars, pos);
        if chars.get(pos) == Some(&'\\') {
            let rest = skip_ws(chars, pos + 1);
            if rest < chars.len() && chars[rest] != ';' {
                return Err(self.error("unexpected text after '\\'"));
            }
            self.continues = true;
            return Ok(chars.len());
        }
        Ok(pos)
    }

    fn open(&mut self) -> Result<(), AllInOneError> {
        if !self.can_open {
            return Err(self.error("'{' without a key"));
        }
        self.can_open = false;
        let (key, node) = match self.top().children.pop() {
            Some(entry) => entry,
            None => return Err(self.error("'{' without a key")),
        };
        self.stack.push((key, node));
        Ok(())
    }

    fn close(&mut self) -> Result<(), AllInOneError> {
        if self.stack.len() < 2 {
            return Err(self.error("unmatched '}'"));
        }
        self.can_open = false;
        if let Some((key, node)) = self.stack.pop() {
            self.top().children.push((key, node));
        }
        Ok(())
    }

    fn include(&mut self, chars: &[char], pos: usize) -> Result<(), AllInOneError> {
        let pos = skip_ws(chars, pos);
        let (name, _) = match chars.get(pos) {
            Some('"') => self.quoted(chars, pos)?,
            Some(_) => bare_word(chars, pos),
            None => return Err(self.error("#include without a file name")),
        };
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(self.error(format!("#include nested deeper than {MAX_INCLUDE_DEPTH}")));
        }
        let path = match &self.base {
            Some(base) => base.join(&name),
            None => PathBuf::from(&name),
        };
        let included = read_info_file_at_depth(&path, self.depth + 1)?;
        self.top().children.extend(included.children);
        self.can_open = false;
        Ok(())
    }

    /// Quoted string starting at `pos` (which holds `"`)
    fn quoted(&self, chars: &[char], pos: usize) -> Result<(String, usize), AllInOneError> {
        let mut out = String::new();
        let mut i = pos + 1;
        while i < chars.len() {
            match chars[i] {
                '"' => return Ok((out, i + 1)),
                '\\' => {
                    let escaped = chars
                        .get(i + 1)
                        .ok_or_else(|| self.error("dangling escape in string"))?;
                    out.push(match escaped {
                        '0' => '\0',
                        'a' => '\u{07}',
                        'b' => '\u{08}',
                        'f' => '\u{0C}',
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        'v' => '\u{0B}',
                        '"' => '"',
                        '\'' => '\'',
                        '\\' => '\\',
                        other => return Err(self.error(format!("unknown escape '\\{other}'"))),
                    });
                    i += 2;
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        Err(self.error("unterminated string"))
    }

    fn starts_with(&self, chars: &[char], pos: usize, word: &str) -> bool {
        let mut i = pos;
        for expected in word.chars() {
            if chars.get(i) != Some(&expected) {
                return false;
            }
            i += 1;
        }
        true
    }
}

fn skip_ws(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

fn bare_word(chars: &[char], pos: usize) -> (String, usize) {
    let end = chars[pos..]
        .iter()
        .position(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '"'))
        .map_or(chars.len(), |off| pos + off);
    (chars[pos..end].iter().collect(), end)
}

// ═══════════════════════════════════════════════════════════════
// Writer
// ═══════════════════════════════════════════════════════════════

fn write_children(out: &mut String, tree: &ConfigTree, depth: usize) {
    let indent = "    ".repeat(depth);
    for (key, child) in &tree.children {
        out.push_str(&indent);
        out.push_str(&quote(key));
        if !child.value.is_empty() || child.children.is_empty() {
            out.push(' ');
            out.push_str(&quote(&child.value));
        }
        out.push('\n');
        if !child.children.is_empty() {
            out.push_str(&indent);
            out.push_str("{\n");
            write_children(out, child, depth + 1);
            out.push_str(&indent);
            out.push_str("}\n");
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.starts_with('#')
        || s.chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | ';' | '{' | '}' | '\\'))
}

fn quote(s: &str) -> String {
    if !needs_quotes(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0B}' => out.push_str("\\v"),
            '\u{0C}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
