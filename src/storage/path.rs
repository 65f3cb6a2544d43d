//! The `>KIND~name` object path syntax.
//!
//! A path is one or more segments, each `>` + kind code + `~` + name, e.g.
//! `>MODG~Clusters>NNET~5k`. Kind codes are listed on
//! [`ObjectKind::code`](crate::core::ObjectKind::code).

use crate::core::{ModelError, ObjectKind, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref SEGMENT: Regex = Regex::new(r"^([A-Za-z]+)~(.+)$").expect("valid segment pattern");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub kind: ObjectKind,
    pub name: String,
}

impl PathSegment {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ">{}~{}", self.kind.code(), self.name)
    }
}

pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let trimmed = path.trim();
    let body = trimmed.strip_prefix('>').ok_or_else(|| {
        ModelError::ValidationError(format!("object path must start with '>': {}", path))
    })?;

    body.split('>')
        .map(|raw| {
            let caps = SEGMENT.captures(raw).ok_or_else(|| {
                ModelError::ValidationError(format!("malformed path segment '{}'", raw))
            })?;
            let kind = ObjectKind::from_code(&caps[1]).ok_or_else(|| {
                ModelError::ValidationError(format!("unknown object kind code '{}'", &caps[1]))
            })?;
            Ok(PathSegment::new(kind, &caps[2]))
        })
        .collect()
}

pub fn format_path(segments: &[PathSegment]) -> String {
    segments.iter().map(ToString::to_string).collect()
}
