//! Declaration synthesis: for every collected dependency, a minimally
//! correct declaration with faithful types and throwing bodies.

pub mod init;

use crate::collect::Grouped;
use crate::decl::{
    ClassDecl, ClassKind, FunDecl, FunTy, Tparam, Ty, TypedefDecl, short_name,
    strip_root,
};
use crate::dep::Dep;
use crate::error::ExtractError;
use crate::extract::ExtractEnv;
use std::collections::{BTreeMap, BTreeSet};

/// Synthetic helper emitted once in the top-level file. Parameter defaults
/// and constructor property assignments call it to satisfy the checker
/// without committing to a concrete value.
pub const DEFAULT_FACTORY_DECL: &str =
    "function default_factory(): nothing { throw new \\Exception(); }";

const THROW_BODY: &str = "{ throw new \\Exception(); }";

/// Fully qualified name -> synthesized declaration texts. Multiple entries
/// may share a key; every entry is emitted.
pub type DeclTable = BTreeMap<String, Vec<String>>;

/// Literal method body to splice into its owning class instead of a stub.
#[derive(Debug)]
pub struct MethodInline {
    pub class: String,
    pub text: String,
}

pub fn table_key(name: &str) -> String {
    strip_root(name).to_owned()
}

/// Synthesize every grouped dependency into the declaration table.
pub fn make_decls(
    env: &ExtractEnv<'_>,
    grouped: &Grouped,
    inline: Option<&MethodInline>,
) -> Result<DeclTable, ExtractError> {
    let mut table = DeclTable::new();
    for (class, deps) in &grouped.types {
        let inline_text = inline
            .filter(|splice| splice.class == *class)
            .map(|splice| splice.text.as_str());
        let text = type_text(env, class, deps, inline_text)?;
        table.entry(table_key(class)).or_default().push(text);
    }
    for dep in &grouped.globals {
        match dep {
            Dep::Fun(name) => {
                let decl = env.decls.get_fun(name).ok_or_else(|| {
                    ExtractError::DependencyNotFound(dep.to_string())
                })?;
                table
                    .entry(table_key(name))
                    .or_default()
                    .push(function_text(env, &decl));
            }
            Dep::GConst(name) => {
                let decl = env.decls.get_gconst(name).ok_or_else(|| {
                    ExtractError::DependencyNotFound(dep.to_string())
                })?;
                let text = format!(
                    "const {} {} = {};",
                    env.printer.full_decl(&decl.ty),
                    short_name(name),
                    init::initial_value(env.decls, &decl.ty)?
                );
                table.entry(table_key(name)).or_default().push(text);
            }
            Dep::RecordDef(name) => {
                return Err(ExtractError::unsupported(format!(
                    "record declaration {name}"
                )));
            }
            other => {
                return Err(ExtractError::unexpected(format!(
                    "{other} in the global partition"
                )));
            }
        }
    }
    Ok(table)
}

fn type_text(
    env: &ExtractEnv<'_>,
    name: &str,
    deps: &BTreeSet<Dep>,
    inline: Option<&str>,
) -> Result<String, ExtractError> {
    if let Some(class) = env.decls.get_class(name) {
        if class.kind == ClassKind::Enum {
            enum_text(env, &class, deps)
        } else {
            object_text(env, &class, deps, inline)
        }
    } else if let Some(td) = env.decls.get_typedef(name) {
        Ok(typedef_text(env, &td))
    } else {
        Err(ExtractError::DependencyNotFound(format!("type {name}")))
    }
}

fn typedef_text(env: &ExtractEnv<'_>, td: &TypedefDecl) -> String {
    let keyword = if td.transparent { "type" } else { "newtype" };
    format!(
        "{keyword} {}{} = {};",
        short_name(&td.name),
        tparams_text(&td.tparams),
        env.printer.full_decl(&td.ty)
    )
}

fn tparams_text(tparams: &[Tparam]) -> String {
    if tparams.is_empty() {
        return String::new();
    }
    let names: Vec<&str> =
        tparams.iter().map(|tp| tp.name.as_str()).collect();
    format!("<{}>", names.join(", "))
}

fn kind_keyword(kind: ClassKind) -> &'static str {
    match kind {
        ClassKind::Class => "class",
        ClassKind::AbstractClass => "abstract class",
        ClassKind::Interface => "interface",
        ClassKind::Trait => "trait",
        ClassKind::Enum => "enum",
    }
}

#[derive(Debug, Default)]
struct AncestorClauses {
    extends: Vec<String>,
    implements: Vec<String>,
    uses: Vec<String>,
    req_extends: Vec<String>,
    req_implements: Vec<String>,
}

/// Reduce the ancestor closure to direct ancestors and partition them into
/// the clause each one belongs to, by the ancestor's and the owner's kind.
fn partition_ancestors(
    env: &ExtractEnv<'_>,
    class: &ClassDecl,
) -> Result<AncestorClauses, ExtractError> {
    let mut indirect: BTreeSet<String> = BTreeSet::new();
    for name in class.ancestors.keys() {
        if let Some(ancestor) = env.decls.get_class(name) {
            indirect.extend(ancestor.ancestors.keys().cloned());
        }
    }

    let mut clauses = AncestorClauses::default();
    for (name, ty) in &class.ancestors {
        if indirect.contains(name) {
            continue;
        }
        let ancestor = env.decls.get_class(name).ok_or_else(|| {
            ExtractError::DependencyNotFound(format!("type {name}"))
        })?;
        let printed = env.printer.full_decl(ty);
        match (class.kind, ancestor.kind) {
            (_, ClassKind::Trait) => clauses.uses.push(printed),
            (ClassKind::Interface, ClassKind::Interface) => {
                clauses.extends.push(printed)
            }
            (_, ClassKind::Interface) => clauses.implements.push(printed),
            _ => clauses.extends.push(printed),
        }
    }

    let req_names: Vec<(String, &Ty)> = class
        .req_ancestors
        .iter()
        .filter_map(|ty| {
            ty.apply_name().map(|name| (name.to_owned(), ty))
        })
        .collect();
    let mut req_indirect: BTreeSet<String> = BTreeSet::new();
    for (name, _) in &req_names {
        if let Some(required) = env.decls.get_class(name) {
            req_indirect.extend(required.ancestors.keys().cloned());
        }
    }
    for (name, ty) in req_names {
        if req_indirect.contains(&name) {
            continue;
        }
        let required = env.decls.get_class(&name).ok_or_else(|| {
            ExtractError::DependencyNotFound(format!("type {name}"))
        })?;
        let printed = env.printer.full_decl(ty);
        match required.kind {
            ClassKind::Interface => clauses.req_implements.push(printed),
            ClassKind::Class | ClassKind::AbstractClass => {
                clauses.req_extends.push(printed)
            }
            _ => {}
        }
    }
    Ok(clauses)
}

fn object_text(
    env: &ExtractEnv<'_>,
    class: &ClassDecl,
    deps: &BTreeSet<Dep>,
    inline: Option<&str>,
) -> Result<String, ExtractError> {
    let clauses = partition_ancestors(env, class)?;

    let mut header = format!(
        "{} {}{}",
        kind_keyword(class.kind),
        short_name(&class.name),
        tparams_text(&class.tparams)
    );
    if !clauses.extends.is_empty() {
        header.push_str(&format!(" extends {}", clauses.extends.join(", ")));
    }
    if !clauses.implements.is_empty() {
        header.push_str(&format!(
            " implements {}",
            clauses.implements.join(", ")
        ));
    }

    let mut members: Vec<String> = Vec::new();
    for req in &clauses.req_extends {
        members.push(format!("require extends {req};"));
    }
    for req in &clauses.req_implements {
        members.push(format!("require implements {req};"));
    }
    for used in &clauses.uses {
        members.push(format!("use {used};"));
    }

    let mut prop_deps: Vec<&str> = Vec::new();
    let mut has_cstr_dep = false;
    for dep in deps {
        match dep {
            Dep::Const { name, .. } => {
                members.push(const_text(env, class, name)?)
            }
            Dep::Prop { name, .. } => {
                prop_deps.push(name);
                members.push(prop_text(env, class, name, false)?);
            }
            Dep::SProp { name, .. } => {
                members.push(prop_text(env, class, name, true)?)
            }
            Dep::Method { name, .. } => {
                members.push(method_text(env, class, name, false)?)
            }
            Dep::SMethod { name, .. } => {
                members.push(method_text(env, class, name, true)?)
            }
            Dep::Cstr(_) => has_cstr_dep = true,
            other => {
                return Err(ExtractError::unexpected(format!(
                    "{other} grouped under {}",
                    class.name
                )));
            }
        }
    }

    if let Some(text) =
        constructor_text(env, class, &prop_deps, has_cstr_dep)?
    {
        members.push(text);
    }
    if let Some(text) = inline {
        members.push(text.to_owned());
    }

    if members.is_empty() {
        return Ok(format!("{header} {{}}"));
    }
    let body: Vec<String> =
        members.iter().map(|member| format!("  {member}")).collect();
    Ok(format!("{header} {{\n{}\n}}", body.join("\n")))
}

fn enum_text(
    env: &ExtractEnv<'_>,
    class: &ClassDecl,
    deps: &BTreeSet<Dep>,
) -> Result<String, ExtractError> {
    let enum_ty = class.enum_ty.as_ref().ok_or_else(|| {
        ExtractError::unexpected(format!(
            "enum {} without a base type",
            class.name
        ))
    })?;
    let mut header = format!(
        "enum {}: {}",
        short_name(&class.name),
        env.printer.full_decl(&enum_ty.base)
    );
    if let Some(constraint) = &enum_ty.constraint {
        header
            .push_str(&format!(" as {}", env.printer.full_decl(constraint)));
    }

    let mut entries = Vec::new();
    for dep in deps {
        let Dep::Const { name, .. } = dep else { continue };
        if name == "class" {
            continue;
        }
        entries.push(format!(
            "  {} = {};",
            name,
            init::initial_value(env.decls, &enum_ty.base)?
        ));
    }
    if entries.is_empty() {
        return Ok(format!("{header} {{}}"));
    }
    Ok(format!("{header} {{\n{}\n}}", entries.join("\n")))
}

fn const_text(
    env: &ExtractEnv<'_>,
    class: &ClassDecl,
    name: &str,
) -> Result<String, ExtractError> {
    if let Some(tc) = class.typeconsts.get(name) {
        let mut text = String::new();
        if tc.is_abstract {
            text.push_str("abstract ");
        }
        text.push_str(&format!("const type {name}"));
        if let Some(constraint) = &tc.constraint {
            text.push_str(&format!(
                " as {}",
                env.printer.full_decl(constraint)
            ));
        }
        if let Some(ty) = &tc.ty {
            text.push_str(&format!(" = {}", env.printer.full_decl(ty)));
        }
        text.push(';');
        return Ok(text);
    }
    let konst = class.consts.get(name).ok_or_else(|| {
        ExtractError::DependencyNotFound(format!(
            "class constant {}::{name}",
            class.name
        ))
    })?;
    let printed = env.printer.full_decl(&konst.ty);
    if konst.is_abstract {
        Ok(format!("abstract const {printed} {name};"))
    } else {
        Ok(format!(
            "const {printed} {name} = {};",
            init::initial_value(env.decls, &konst.ty)?
        ))
    }
}

fn prop_text(
    env: &ExtractEnv<'_>,
    class: &ClassDecl,
    name: &str,
    is_static: bool,
) -> Result<String, ExtractError> {
    let table = if is_static { &class.sprops } else { &class.props };
    let prop = table.get(name).ok_or_else(|| {
        ExtractError::DependencyNotFound(format!(
            "property {}::${name}",
            class.name
        ))
    })?;
    let mut text = format!("{} ", prop.visibility.as_str());
    if is_static {
        text.push_str("static ");
    }
    text.push_str(&format!(
        "{} ${name}",
        env.printer.full_decl(&prop.ty)
    ));
    if is_static && !prop.is_abstract {
        text.push_str(&format!(
            " = {}",
            init::initial_value(env.decls, &prop.ty)?
        ));
    }
    text.push(';');
    Ok(text)
}

fn method_text(
    env: &ExtractEnv<'_>,
    class: &ClassDecl,
    name: &str,
    is_static: bool,
) -> Result<String, ExtractError> {
    let table = if is_static { &class.smethods } else { &class.methods };
    let method = table.get(name).ok_or_else(|| {
        ExtractError::DependencyNotFound(format!(
            "method {}::{name}",
            class.name
        ))
    })?;
    let in_interface = class.kind == ClassKind::Interface;
    let bodyless = method.is_abstract || in_interface;

    let mut text = String::new();
    if method.is_abstract && !in_interface {
        text.push_str("abstract ");
    }
    text.push_str(method.visibility.as_str());
    text.push(' ');
    if is_static {
        text.push_str("static ");
    }
    text.push_str(&format!(
        "function {name}{}({})",
        tparams_text(&method.ty.tparams),
        params_text(env, &method.ty)
    ));
    if method.ty.ret != Ty::Any {
        text.push_str(&format!(
            ": {}",
            env.printer.full_decl(&method.ty.ret)
        ));
    }
    if bodyless {
        text.push(';');
    } else {
        text.push_str(&format!(" {THROW_BODY}"));
    }
    Ok(text)
}

/// Parameters at or past the minimum arity default to `default_factory()`;
/// a variadic parameter trails with `...`.
fn params_text(env: &ExtractEnv<'_>, fun: &FunTy) -> String {
    let mut parts = Vec::new();
    for (idx, param) in fun.params.iter().enumerate() {
        let mut text = String::new();
        if param.inout {
            text.push_str("inout ");
        }
        text.push_str(&format!(
            "{} ${}",
            env.printer.full_decl(&param.ty),
            param.name
        ));
        if idx >= fun.min_arity {
            text.push_str(" = default_factory()");
        }
        parts.push(text);
    }
    if let Some(variadic) = &fun.variadic {
        parts.push(format!(
            "{} ...${}",
            env.printer.full_decl(&variadic.ty),
            variadic.name
        ));
    }
    parts.join(", ")
}

fn function_text(env: &ExtractEnv<'_>, decl: &FunDecl) -> String {
    let mut text = format!(
        "function {}{}({})",
        short_name(&decl.name),
        tparams_text(&decl.ty.tparams),
        params_text(env, &decl.ty)
    );
    if decl.ty.ret != Ty::Any {
        text.push_str(&format!(
            ": {}",
            env.printer.full_decl(&decl.ty.ret)
        ));
    }
    format!("{text} {THROW_BODY}")
}

/// A class with collected properties gets a constructor assigning each of
/// them; an existing constructor contributes its signature.
fn constructor_text(
    env: &ExtractEnv<'_>,
    class: &ClassDecl,
    prop_deps: &[&str],
    has_cstr_dep: bool,
) -> Result<Option<String>, ExtractError> {
    if prop_deps.is_empty() {
        if !has_cstr_dep {
            return Ok(None);
        }
        let Some(cstr) = &class.constructor else {
            return Ok(None);
        };
        return Ok(Some(format!(
            "{} function __construct({}) {THROW_BODY}",
            cstr.visibility.as_str(),
            params_text(env, &cstr.ty)
        )));
    }

    let assignments: Vec<String> = prop_deps
        .iter()
        .map(|prop| format!("$this->{prop} = default_factory();"))
        .collect();
    let signature = match &class.constructor {
        Some(cstr) => format!(
            "{} function __construct({})",
            cstr.visibility.as_str(),
            params_text(env, &cstr.ty)
        ),
        None => "public function __construct()".to_owned(),
    };
    Ok(Some(format!("{signature} {{ {} }}", assignments.join(" "))))
}
