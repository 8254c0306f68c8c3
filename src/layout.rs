//! Namespace layout and final emission.
//!
//! Top-level declarations and namespaced ones cannot share a file in the
//! host language, so the assembled output is split in two and joined with
//! multi-file markers when both carry content.

use crate::decl::BUILTIN_ROOT;
use crate::extract::ExtractEnv;
use crate::synth::{DEFAULT_FACTORY_DECL, DeclTable};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Language mode marker heading every emitted file.
pub const HEADER_LINE: &str = "<?hh";

pub const TOPLEVEL_MARKER: &str = "////toplevel.php";
pub const NAMESPACES_MARKER: &str = "////namespaces.php";

/// Nested namespaces with the declaration keys they hold.
#[derive(Debug, Default)]
pub struct NsTree {
    subs: BTreeMap<String, NsTree>,
    decls: BTreeSet<String>,
}

impl NsTree {
    /// Place a qualified key (no leading `\`) by walking its segments.
    /// Names rooted in the standard library's namespace are dropped; the
    /// builtin filter upstream already excludes them, this check stays as
    /// a backstop.
    pub fn insert(&mut self, key: &str) {
        let segments: Vec<&str> = key.split('\\').collect();
        if segments.len() > 1 && segments[0] == BUILTIN_ROOT {
            return;
        }
        let mut node = self;
        for segment in &segments[..segments.len() - 1] {
            node = node.subs.entry((*segment).to_owned()).or_default();
        }
        node.decls.insert(key.to_owned());
    }

    pub fn has_namespaces(&self) -> bool {
        !self.subs.is_empty()
    }
}

/// Build both files from the declaration table and join them.
pub fn assemble(env: &ExtractEnv<'_>, table: &DeclTable) -> String {
    let mut tree = NsTree::default();
    for key in table.keys() {
        tree.insert(key);
    }

    let mut top_parts =
        vec![HEADER_LINE.to_owned(), DEFAULT_FACTORY_DECL.to_owned()];
    for key in &tree.decls {
        top_parts.extend(decl_texts(table, key));
    }
    let top = format_best_effort(env, &top_parts.join("\n\n"));

    if !tree.has_namespaces() {
        return top;
    }

    let mut ns_parts = vec![HEADER_LINE.to_owned()];
    for (name, node) in &tree.subs {
        ns_parts.push(render_namespace(name, node, table));
    }
    let namespaced = format_best_effort(env, &ns_parts.join("\n\n"));

    format!("{TOPLEVEL_MARKER}\n{top}\n{NAMESPACES_MARKER}\n{namespaced}")
}

fn decl_texts(table: &DeclTable, key: &str) -> Vec<String> {
    table.get(key).into_iter().flatten().cloned().collect()
}

fn render_namespace(name: &str, node: &NsTree, table: &DeclTable) -> String {
    let mut body = Vec::new();
    for key in &node.decls {
        body.extend(decl_texts(table, key));
    }
    for (sub, child) in &node.subs {
        body.push(render_namespace(sub, child, table));
    }
    format!("namespace {name} {{\n{}\n}}", body.join("\n\n"))
}

fn format_best_effort(env: &ExtractEnv<'_>, text: &str) -> String {
    match env.formatter.format(text) {
        Ok(formatted) => formatted,
        Err(error) => {
            warn!(%error, "formatter failed; emitting raw text");
            text.to_owned()
        }
    }
}
