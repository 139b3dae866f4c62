//! Key-addressed sections inside a shared source file.
//!
//! A section is a block delimited by marker comments:
//!
//! ```text
//!     // crudgen:begin productCategory ProductCategory
//!     ...body...
//!     // crudgen:end productCategory
//! ```
//!
//! New sections are inserted directly above an anchor comment, indented
//! like it. Everything outside sections is preserved byte for byte.

use serde::{Deserialize, Serialize};

const BEGIN: &str = "// crudgen:begin ";
const END: &str = "// crudgen:end ";

/// Anchor comment in the route registry.
pub const ROUTES_ANCHOR: &str = "// crudgen:routes";
/// Anchor comment in the navigation menu file.
pub const MENU_ANCHOR: &str = "// crudgen:menu";

/// A shared file that generated sections are written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedTarget {
    RouteRegistry,
    Menu,
}

impl SharedTarget {
    pub fn anchor(&self) -> &'static str {
        match self {
            SharedTarget::RouteRegistry => ROUTES_ANCHOR,
            SharedTarget::Menu => MENU_ANCHOR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SharedTarget::RouteRegistry => "route_registry",
            SharedTarget::Menu => "menu",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionError {
    #[error("anchor '{0}' not found")]
    MissingAnchor(String),

    #[error("section '{key}' is owned by '{owner}'")]
    Conflict { key: String, owner: String },

    #[error("malformed section markers at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("invalid section '{key}': {message}")]
    Invalid { key: String, message: String },
}

/// Result of a successful upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    Unchanged,
}

/// A parsed section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: String,
    pub owner: String,
    /// Body lines with the section indentation removed.
    pub body: Vec<String>,
    indent: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Line(String),
    Section(Section),
}

/// A shared document split into plain lines and keyed sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDocument {
    segments: Vec<Segment>,
    trailing_newline: bool,
}

impl SectionDocument {
    pub fn parse(text: &str) -> Result<Self, SectionError> {
        let trailing_newline = text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);
        let mut segments = Vec::new();
        let mut open: Option<(usize, Section)> = None;

        if !text.is_empty() {
            for (idx, line) in body.split('\n').enumerate() {
                let lineno = idx + 1;
                let trimmed = line.trim_start();
                let indent = &line[..line.len() - trimmed.len()];

                if let Some(rest) = trimmed.strip_prefix(BEGIN) {
                    if let Some((start, _)) = &open {
                        return Err(malformed(
                            lineno,
                            format!("nested begin marker, section opened at line {}", start),
                        ));
                    }
                    let mut parts = rest.split_whitespace();
                    let (Some(key), Some(owner), None) = (parts.next(), parts.next(), parts.next())
                    else {
                        return Err(malformed(lineno, "begin marker needs a key and an owner"));
                    };
                    open = Some((
                        lineno,
                        Section {
                            key: key.to_string(),
                            owner: owner.to_string(),
                            body: Vec::new(),
                            indent: indent.to_string(),
                        },
                    ));
                } else if let Some(rest) = trimmed.strip_prefix(END) {
                    let Some((_, section)) = open.take() else {
                        return Err(malformed(lineno, "end marker without a begin marker"));
                    };
                    if rest.trim() != section.key {
                        return Err(malformed(
                            lineno,
                            format!("end marker '{}' closes section '{}'", rest.trim(), section.key),
                        ));
                    }
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Section(other) if other.key == section.key))
                    {
                        return Err(malformed(
                            lineno,
                            format!("section '{}' appears more than once", section.key),
                        ));
                    }
                    segments.push(Segment::Section(section));
                } else if let Some((_, section)) = open.as_mut() {
                    let stripped = line.strip_prefix(section.indent.as_str()).unwrap_or(trimmed);
                    section.body.push(stripped.to_string());
                } else {
                    segments.push(Segment::Line(line.to_string()));
                }
            }
        }

        if let Some((start, section)) = open {
            return Err(malformed(
                start,
                format!("section '{}' is never closed", section.key),
            ));
        }

        Ok(Self {
            segments,
            trailing_newline,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections().find(|s| s.key == key)
    }

    /// Keys in document order.
    pub fn keys(&self) -> Vec<&str> {
        self.sections().map(|s| s.key.as_str()).collect()
    }

    /// Keys of the sections owned by `owner`, in document order.
    pub fn keys_owned_by(&self, owner: &str) -> Vec<String> {
        self.sections()
            .filter(|s| s.owner == owner)
            .map(|s| s.key.clone())
            .collect()
    }

    fn sections(&self) -> impl Iterator<Item = &Section> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Section(section) => Some(section),
            Segment::Line(_) => None,
        })
    }

    /// Insert or replace the section `key`.
    ///
    /// An existing section is replaced in place only when `owner` matches.
    /// A new section goes directly above `anchor`. Keys and owners are single
    /// words and the body holds no marker lines.
    pub fn upsert(
        &mut self,
        anchor: &str,
        key: &str,
        owner: &str,
        body: &str,
    ) -> Result<Upsert, SectionError> {
        check_word(key, key, "key")?;
        check_word(key, owner, "owner")?;
        let lines: Vec<String> = body.lines().map(|l| l.to_string()).collect();
        if let Some(line) = lines.iter().find(|l| is_marker(l)) {
            return Err(SectionError::Invalid {
                key: key.to_string(),
                message: format!("body contains a marker line '{}'", line.trim()),
            });
        }

        for segment in &mut self.segments {
            if let Segment::Section(section) = segment {
                if section.key != key {
                    continue;
                }
                if section.owner != owner {
                    return Err(SectionError::Conflict {
                        key: key.to_string(),
                        owner: section.owner.clone(),
                    });
                }
                if section.body == lines {
                    return Ok(Upsert::Unchanged);
                }
                section.body = lines;
                return Ok(Upsert::Replaced);
            }
        }

        let position = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::Line(l) if l.trim() == anchor))
            .ok_or_else(|| SectionError::MissingAnchor(anchor.to_string()))?;
        let indent = match &self.segments[position] {
            Segment::Line(l) => l[..l.len() - l.trim_start().len()].to_string(),
            Segment::Section(_) => String::new(),
        };
        self.segments.insert(
            position,
            Segment::Section(Section {
                key: key.to_string(),
                owner: owner.to_string(),
                body: lines,
                indent,
            }),
        );
        Ok(Upsert::Inserted)
    }

    /// Remove the section `key`. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.segments.len();
        self.segments
            .retain(|s| !matches!(s, Segment::Section(section) if section.key == key));
        self.segments.len() != before
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut first = true;
        let mut push = |line: &str| {
            if !first {
                out.push('\n');
            }
            first = false;
            out.push_str(line);
        };
        for segment in &self.segments {
            match segment {
                Segment::Line(line) => push(line),
                Segment::Section(section) => {
                    let indent = &section.indent;
                    push(&format!("{}{}{} {}", indent, BEGIN, section.key, section.owner));
                    for line in &section.body {
                        if line.is_empty() {
                            push("");
                        } else {
                            push(&format!("{}{}", indent, line));
                        }
                    }
                    push(&format!("{}{}{}", indent, END, section.key));
                }
            }
        }
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

fn check_word(key: &str, value: &str, what: &str) -> Result<(), SectionError> {
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(SectionError::Invalid {
            key: key.to_string(),
            message: format!("{} '{}' must be a single non-empty word", what, value),
        });
    }
    Ok(())
}

fn is_marker(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with(BEGIN.trim_end()) || trimmed.starts_with(END.trim_end())
}

fn malformed(line: usize, message: impl Into<String>) -> SectionError {
    SectionError::Malformed {
        line,
        message: message.into(),
    }
}
