//! Extracts a self-contained, type-checkable slice of a Hack codebase
//! around a single entry point: a top-level function or a named method.
//!
//! The extractor drives the host type-checker to record dependency edges,
//! closes the resulting set under signature walks, synthesizes a stub
//! declaration for every dependency, and lays the stubs out into
//! namespaces next to the entry point's literal body. The checker, decl
//! provider, type printer, source reader and formatter are external
//! collaborators behind the traits in [`providers`].

pub mod collect;
pub mod decl;
pub mod dep;
pub mod entry;
pub mod error;
pub mod extract;
pub mod layout;
pub mod providers;
pub mod synth;

pub use collect::{DepSet, Grouped};
pub use decl::{
    ClassConst, ClassDecl, ClassKind, EnumTy, FunDecl, FunParam, FunTy,
    GConstDecl, MethodDecl, Pos, Prim, PropDecl, ShapeField, Tparam, Ty,
    TypeConst, TypedefDecl, Visibility,
};
pub use dep::Dep;
pub use entry::{Entry, Member};
pub use error::ExtractError;
pub use extract::{ExtractEnv, extract, go};
pub use providers::{
    CallbackGuard, DeclProvider, Formatter, SourceReader, TypeChecker,
    TypePrinter, add_dependency_callback, emit_dependency,
};
pub use synth::{DeclTable, MethodInline};
