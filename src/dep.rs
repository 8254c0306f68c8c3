//! Dependency-graph nodes and the predicates that classify them.

use crate::decl::strip_root;
use crate::entry::{Entry, Member};
use crate::error::ExtractError;
use crate::providers::DeclProvider;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Filename suffix of the header-interface stubs shipped with the host
/// language's standard library.
pub const HEADER_INTERFACE_EXT: &str = ".hhi";

/// A single element of the program's dependency graph.
///
/// Global variants are identified by a fully qualified name; class-bound
/// variants carry their owning class.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Dep {
    Class(String),
    Fun(String),
    FunName(String),
    GConst(String),
    GConstName(String),
    RecordDef(String),
    Method { class: String, name: String },
    SMethod { class: String, name: String },
    Prop { class: String, name: String },
    SProp { class: String, name: String },
    Const { class: String, name: String },
    Cstr(String),
    AllMembers(String),
    Extends(String),
}

impl Dep {
    /// True for every variant that carries a class, `Class` included.
    pub fn is_class_dep(&self) -> bool {
        matches!(self, Dep::Class(_)) || self.is_class_bound()
    }

    /// True only for the member-level variants bound to an owning class.
    pub fn is_class_bound(&self) -> bool {
        matches!(
            self,
            Dep::Method { .. }
                | Dep::SMethod { .. }
                | Dep::Prop { .. }
                | Dep::SProp { .. }
                | Dep::Const { .. }
                | Dep::Cstr(_)
                | Dep::AllMembers(_)
                | Dep::Extends(_)
        )
    }

    /// The class name embedded in a class-carrying variant.
    pub fn owner_class(&self) -> Result<&str, ExtractError> {
        match self {
            Dep::Class(class)
            | Dep::Cstr(class)
            | Dep::AllMembers(class)
            | Dep::Extends(class)
            | Dep::Method { class, .. }
            | Dep::SMethod { class, .. }
            | Dep::Prop { class, .. }
            | Dep::SProp { class, .. }
            | Dep::Const { class, .. } => Ok(class),
            other => Err(ExtractError::unexpected(format!(
                "no owning class on {other}"
            ))),
        }
    }

    /// The fully qualified name of a global variant.
    pub fn global_name(&self) -> Result<&str, ExtractError> {
        match self {
            Dep::Fun(name)
            | Dep::FunName(name)
            | Dep::GConst(name)
            | Dep::GConstName(name)
            | Dep::RecordDef(name) => Ok(name),
            other => Err(ExtractError::unexpected(format!(
                "no global name on {other}"
            ))),
        }
    }
}

impl fmt::Display for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dep::Class(name) => write!(f, "type {name}"),
            Dep::Fun(name) | Dep::FunName(name) => write!(f, "function {name}"),
            Dep::GConst(name) | Dep::GConstName(name) => {
                write!(f, "global constant {name}")
            }
            Dep::RecordDef(name) => write!(f, "record {name}"),
            Dep::Method { class, name } => write!(f, "method {class}::{name}"),
            Dep::SMethod { class, name } => {
                write!(f, "static method {class}::{name}")
            }
            Dep::Prop { class, name } => write!(f, "property {class}::${name}"),
            Dep::SProp { class, name } => {
                write!(f, "static property {class}::${name}")
            }
            Dep::Const { class, name } => {
                write!(f, "class constant {class}::{name}")
            }
            Dep::Cstr(class) => write!(f, "constructor of {class}"),
            Dep::AllMembers(class) => write!(f, "members of {class}"),
            Dep::Extends(class) => write!(f, "ancestors of {class}"),
        }
    }
}

/// Magic constants the host language resolves without any declaration.
static PSEUDO_CONSTS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    [
        "__CLASS__",
        "__COMPILER_FRONTEND__",
        "__DIR__",
        "__FILE__",
        "__FUNCTION__",
        "__FUNCTION_CREDENTIAL__",
        "__LINE__",
        "__METHOD__",
        "__NAMESPACE__",
        "__TRAIT__",
    ]
    .into_iter()
    .collect()
});

pub fn is_pseudo_const(name: &str) -> bool {
    PSEUDO_CONSTS.contains(strip_root(name))
}

fn is_header_file(file: &str) -> bool {
    file.ends_with(HEADER_INTERFACE_EXT)
}

fn type_decl_in_header(decls: &dyn DeclProvider, name: &str) -> bool {
    if let Some(class) = decls.get_class(name) {
        return is_header_file(&class.pos.file);
    }
    if let Some(td) = decls.get_typedef(name) {
        return is_header_file(&td.pos.file);
    }
    false
}

/// Whether the dependency resolves to the standard library's header set.
/// Builtins are never added to the dependency graph.
pub fn is_builtin(decls: &dyn DeclProvider, dep: &Dep) -> bool {
    match dep {
        Dep::GConst(name) | Dep::GConstName(name) => is_pseudo_const(name),
        Dep::Fun(name) | Dep::FunName(name) => decls
            .get_fun(name)
            .map(|fun| is_header_file(&fun.pos.file))
            .unwrap_or(false),
        Dep::Class(name) | Dep::RecordDef(name) => {
            type_decl_in_header(decls, name)
        }
        Dep::Method { class, .. }
        | Dep::SMethod { class, .. }
        | Dep::Prop { class, .. }
        | Dep::SProp { class, .. }
        | Dep::Const { class, .. } => type_decl_in_header(decls, class),
        Dep::Cstr(class) | Dep::AllMembers(class) | Dep::Extends(class) => {
            type_decl_in_header(decls, class)
        }
    }
}

/// Filter applied when the checker reports an edge `source -> target`
/// while checking the entry point's file.
///
/// Edges for a method entry are recorded at class granularity.
pub fn is_relevant(entry: &Entry, source: &Dep) -> bool {
    match entry {
        Entry::Function(name) => {
            matches!(source, Dep::Fun(n) | Dep::FunName(n) if n == name)
        }
        Entry::Member { class, member: Member::Method(_) } => {
            source.is_class_bound()
                && source.owner_class().map(|c| c == class).unwrap_or(false)
        }
        Entry::Member { .. } => false,
    }
}
