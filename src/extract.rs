//! Top-level orchestration: collect, synthesize, lay out, format.

use crate::collect;
use crate::entry::{Entry, Member};
use crate::error::ExtractError;
use crate::layout;
use crate::providers::{
    DeclProvider, Formatter, SourceReader, TypeChecker, TypePrinter,
};
use crate::synth::{self, MethodInline};
use tracing::debug;

/// Collaborator services one extraction runs against.
pub struct ExtractEnv<'a> {
    pub decls: &'a dyn DeclProvider,
    pub checker: &'a dyn TypeChecker,
    pub printer: &'a dyn TypePrinter,
    pub reader: &'a dyn SourceReader,
    pub formatter: &'a dyn Formatter,
}

/// Run one extraction request end to end, translating every failure into
/// its user-visible diagnostic text.
pub fn go(env: &ExtractEnv<'_>, request: &str) -> String {
    match Entry::parse(request).and_then(|entry| extract(env, &entry)) {
        Ok(text) => text,
        Err(error) => error.user_message(),
    }
}

/// Extract a self-contained slice around `entry`.
pub fn extract(
    env: &ExtractEnv<'_>,
    entry: &Entry,
) -> Result<String, ExtractError> {
    match entry {
        Entry::Function(name) => extract_function(env, name),
        Entry::Member { class, member: Member::Method(method) } => {
            extract_method(env, class, method)
        }
        Entry::Member { .. } => Err(ExtractError::InvalidInput),
    }
}

fn extract_function(
    env: &ExtractEnv<'_>,
    name: &str,
) -> Result<String, ExtractError> {
    let decl = env.decls.get_fun(name).ok_or(ExtractError::NotFound)?;
    let entry = Entry::Function(name.to_owned());

    let set = collect::collect(env, &entry)?;
    let grouped = collect::group(env, set)?;
    debug!(
        types = grouped.types.len(),
        globals = grouped.globals.len(),
        "synthesizing slice for function {name}"
    );

    let mut table = synth::make_decls(env, &grouped, None)?;
    let body = env.reader.text_at(&decl.pos).ok_or_else(|| {
        ExtractError::DependencyNotFound(format!(
            "source text of function {name}"
        ))
    })?;
    table.entry(synth::table_key(name)).or_default().push(body);

    Ok(layout::assemble(env, &table))
}

fn extract_method(
    env: &ExtractEnv<'_>,
    class: &str,
    method: &str,
) -> Result<String, ExtractError> {
    let decl = env.decls.get_class(class).ok_or(ExtractError::NotFound)?;
    let Some(method_decl) = decl
        .methods
        .get(method)
        .or_else(|| decl.smethods.get(method))
    else {
        return Err(ExtractError::NotFound);
    };
    let body = env.reader.text_at(&method_decl.pos).ok_or_else(|| {
        ExtractError::DependencyNotFound(format!(
            "source text of method {class}::{method}"
        ))
    })?;

    let entry = Entry::Member {
        class: class.to_owned(),
        member: Member::Method(method.to_owned()),
    };
    let set = collect::collect(env, &entry)?;
    let grouped = collect::group(env, set)?;
    debug!(
        types = grouped.types.len(),
        globals = grouped.globals.len(),
        "synthesizing slice for method {class}::{method}"
    );

    let inline = MethodInline { class: class.to_owned(), text: body };
    let table = synth::make_decls(env, &grouped, Some(&inline))?;

    Ok(layout::assemble(env, &table))
}
