//! Entry-point requests: what the user asked to extract.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};

/// Class member selector inside an entry-point request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Member {
    Method(String),
    Property(String),
    TypeConst(String),
}

/// The function or method the user asked to extract.
///
/// Only `Function` and `Member(_, Method)` are extractable; every other
/// shape is rejected as invalid input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    Function(String),
    Member { class: String, member: Member },
}

impl Entry {
    /// Parse a request of the form `\Ns\fun_name` or `\Ns\Cls::meth`.
    pub fn parse(input: &str) -> Result<Self, ExtractError> {
        let trimmed = input.trim();
        if let Some((class, method)) = trimmed.split_once("::") {
            if !is_qualified_name(class) || !is_identifier(method) {
                return Err(ExtractError::InvalidInput);
            }
            return Ok(Entry::Member {
                class: qualify(class),
                member: Member::Method(method.to_owned()),
            });
        }
        if !is_qualified_name(trimmed) {
            return Err(ExtractError::InvalidInput);
        }
        Ok(Entry::Function(qualify(trimmed)))
    }
}

fn qualify(name: &str) -> String {
    if name.starts_with('\\') {
        name.to_owned()
    } else {
        format!("\\{name}")
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_qualified_name(name: &str) -> bool {
    let bare = name.strip_prefix('\\').unwrap_or(name);
    !bare.is_empty() && bare.split('\\').all(is_identifier)
}
