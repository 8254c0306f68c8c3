//! Dependency collection: drive the external checker over the entry point,
//! capture the edges it records, close the set under signature walks, then
//! group the survivors by owning class.

pub mod walk;

use crate::decl::{ClassDecl, ClassKind};
use crate::dep::{self, Dep};
use crate::entry::{Entry, Member};
use crate::error::ExtractError;
use crate::extract::ExtractEnv;
use crate::providers::{self, DEPENDENCY_CALLBACK};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use self::walk::WalkCtx;
use tracing::debug;

pub type DepSet = BTreeSet<Dep>;

/// Collected dependencies split into class-owned members and globals.
///
/// `types` keys exist even for classes with no collected members, so that
/// bare class references still synthesize a declaration.
#[derive(Debug, Default)]
pub struct Grouped {
    pub types: BTreeMap<String, BTreeSet<Dep>>,
    pub globals: BTreeSet<Dep>,
}

/// Run the collection and closure phases for one entry point.
pub fn collect(
    env: &ExtractEnv<'_>,
    entry: &Entry,
) -> Result<DepSet, ExtractError> {
    let recorded: Arc<Mutex<DepSet>> = Arc::new(Mutex::new(BTreeSet::new()));
    {
        let sink = Arc::clone(&recorded);
        let filter_entry = entry.clone();
        let _guard = providers::add_dependency_callback(
            DEPENDENCY_CALLBACK,
            Box::new(move |source, target| {
                if dep::is_relevant(&filter_entry, source) {
                    sink.lock().insert(target.clone());
                }
            }),
        )?;
        match entry {
            Entry::Function(name) => {
                let decl =
                    env.decls.get_fun(name).ok_or(ExtractError::NotFound)?;
                env.checker.type_fun(&decl.pos.file, name);
            }
            Entry::Member { class, .. } => {
                let decl =
                    env.decls.get_class(class).ok_or(ExtractError::NotFound)?;
                env.checker.type_class(&decl.pos.file, class);
            }
        }
    }

    let mut set: DepSet = recorded.lock().clone();
    debug!(edges = set.len(), "collection phase recorded dependency edges");

    set.retain(|d| !dep::is_builtin(env.decls, d));
    remove_entry_deps(entry, &mut set);
    if let Entry::Member { class, .. } = entry {
        // the owning class is emitted around the inlined method body
        set.insert(Dep::Class(class.clone()));
    }

    close(env, &mut set)?;
    remove_entry_deps(entry, &mut set);
    debug!(nodes = set.len(), "closure phase stabilized");
    Ok(set)
}

fn remove_entry_deps(entry: &Entry, set: &mut DepSet) {
    match entry {
        Entry::Function(name) => {
            set.remove(&Dep::Fun(name.clone()));
            set.remove(&Dep::FunName(name.clone()));
        }
        Entry::Member { class, member: Member::Method(method) } => {
            set.remove(&Dep::Method {
                class: class.clone(),
                name: method.clone(),
            });
            set.remove(&Dep::SMethod {
                class: class.clone(),
                name: method.clone(),
            });
        }
        Entry::Member { .. } => {}
    }
}

/// Worklist closure under signature walks.
fn close(
    env: &ExtractEnv<'_>,
    set: &mut DepSet,
) -> Result<(), ExtractError> {
    let mut work: VecDeque<Dep> = set.iter().cloned().collect();
    let owners: Vec<Dep> = set
        .iter()
        .filter(|dep| dep.is_class_bound())
        .map(|dep| dep.owner_class().map(|c| Dep::Class(c.to_owned())))
        .collect::<Result<_, _>>()?;
    for owner in owners {
        if set.insert(owner.clone()) {
            work.push_back(owner);
        }
    }
    while let Some(next) = work.pop_front() {
        let next = rewrite_static(env, next, set);
        let mut found = Vec::new();
        signature_deps(env, &next, &mut found)?;
        for candidate in found {
            if dep::is_builtin(env.decls, &candidate) {
                continue;
            }
            if candidate.is_class_bound() {
                let owner = Dep::Class(candidate.owner_class()?.to_owned());
                if set.insert(owner.clone()) {
                    work.push_back(owner);
                }
            }
            if set.insert(candidate.clone()) {
                work.push_back(candidate);
            }
        }
    }
    Ok(())
}

/// A static-method node whose class only declares an instance method of
/// that name is rewritten in place; static calls resolve through it.
fn rewrite_static(env: &ExtractEnv<'_>, dep: Dep, set: &mut DepSet) -> Dep {
    let Dep::SMethod { class, name } = &dep else { return dep };
    let Some(decl) = env.decls.get_class(class) else { return dep };
    if decl.smethods.contains_key(name) || !decl.methods.contains_key(name) {
        return dep;
    }
    set.remove(&dep);
    let rewritten =
        Dep::Method { class: class.clone(), name: name.clone() };
    set.insert(rewritten.clone());
    rewritten
}

fn class_or_missing(
    env: &ExtractEnv<'_>,
    name: &str,
) -> Result<Arc<ClassDecl>, ExtractError> {
    env.decls.get_class(name).ok_or_else(|| {
        ExtractError::DependencyNotFound(format!("type {name}"))
    })
}

/// One signature walk from `dep`, pushing every node it reaches.
fn signature_deps(
    env: &ExtractEnv<'_>,
    dep: &Dep,
    out: &mut Vec<Dep>,
) -> Result<(), ExtractError> {
    match dep {
        Dep::Class(name) => class_deps(env, name, out),
        Dep::Fun(name) | Dep::FunName(name) => {
            let decl = env.decls.get_fun(name).ok_or_else(|| {
                ExtractError::DependencyNotFound(dep.to_string())
            })?;
            walk::fun_ty_deps(env, &WalkCtx::plain(), &decl.ty, out)
        }
        Dep::GConst(name) | Dep::GConstName(name) => {
            let decl = env.decls.get_gconst(name).ok_or_else(|| {
                ExtractError::DependencyNotFound(dep.to_string())
            })?;
            walk::ty_deps(env, &WalkCtx::constant(None), &decl.ty, out)
        }
        Dep::Method { class, name } => {
            let decl = class_or_missing(env, class)?;
            let method = decl.methods.get(name).ok_or_else(|| {
                ExtractError::DependencyNotFound(dep.to_string())
            })?;
            walk::fun_ty_deps(env, &WalkCtx::in_class(class), &method.ty, out)
        }
        Dep::SMethod { class, name } => {
            let decl = class_or_missing(env, class)?;
            let method = decl.smethods.get(name).ok_or_else(|| {
                ExtractError::DependencyNotFound(dep.to_string())
            })?;
            walk::fun_ty_deps(env, &WalkCtx::in_class(class), &method.ty, out)
        }
        Dep::Prop { class, name } => {
            let decl = class_or_missing(env, class)?;
            let prop = decl.props.get(name).ok_or_else(|| {
                ExtractError::DependencyNotFound(dep.to_string())
            })?;
            walk::ty_deps(env, &WalkCtx::in_class(class), &prop.ty, out)?;
            out.push(Dep::Cstr(class.clone()));
            Ok(())
        }
        Dep::SProp { class, name } => {
            let decl = class_or_missing(env, class)?;
            let prop = decl.sprops.get(name).ok_or_else(|| {
                ExtractError::DependencyNotFound(dep.to_string())
            })?;
            walk::ty_deps(env, &WalkCtx::in_class(class), &prop.ty, out)?;
            out.push(Dep::Cstr(class.clone()));
            Ok(())
        }
        Dep::Const { class, name } => {
            let decl = class_or_missing(env, class)?;
            if let Some(typeconst) = decl.typeconsts.get(name) {
                let ctx = WalkCtx::in_class(class);
                if let Some(ty) = &typeconst.ty {
                    walk::ty_deps(env, &ctx, ty, out)?;
                }
                if let Some(constraint) = &typeconst.constraint {
                    walk::ty_deps(env, &ctx, constraint, out)?;
                }
                return Ok(());
            }
            let konst = decl.consts.get(name).ok_or_else(|| {
                ExtractError::DependencyNotFound(dep.to_string())
            })?;
            walk::ty_deps(env, &WalkCtx::constant(Some(class)), &konst.ty, out)
        }
        Dep::Cstr(class) => {
            let decl = class_or_missing(env, class)?;
            if let Some(cstr) = &decl.constructor {
                walk::fun_ty_deps(
                    env,
                    &WalkCtx::in_class(class),
                    &cstr.ty,
                    out,
                )?;
            }
            Ok(())
        }
        Dep::AllMembers(class) => {
            let decl = class_or_missing(env, class)?;
            all_member_deps(class, &decl, out);
            Ok(())
        }
        Dep::Extends(class) => {
            out.push(Dep::Class(class.clone()));
            Ok(())
        }
        Dep::RecordDef(_) => Ok(()),
    }
}

fn all_member_deps(class: &str, decl: &ClassDecl, out: &mut Vec<Dep>) {
    let class = class.to_owned();
    for name in decl.consts.keys().filter(|name| *name != "class") {
        out.push(Dep::Const { class: class.clone(), name: name.clone() });
    }
    for name in decl.typeconsts.keys() {
        out.push(Dep::Const { class: class.clone(), name: name.clone() });
    }
    for name in decl.props.keys() {
        out.push(Dep::Prop { class: class.clone(), name: name.clone() });
    }
    for name in decl.sprops.keys() {
        out.push(Dep::SProp { class: class.clone(), name: name.clone() });
    }
    for name in decl.methods.keys() {
        out.push(Dep::Method { class: class.clone(), name: name.clone() });
    }
    for name in decl.smethods.keys() {
        out.push(Dep::SMethod { class: class.clone(), name: name.clone() });
    }
    if decl.constructor.is_some() {
        out.push(Dep::Cstr(class));
    }
}

/// Signature walk for a whole class: ancestors, requirements, the enum
/// base, and the interface methods the class itself must keep providing.
fn class_deps(
    env: &ExtractEnv<'_>,
    name: &str,
    out: &mut Vec<Dep>,
) -> Result<(), ExtractError> {
    let Some(class) = env.decls.get_class(name) else {
        // a bare type reference may name a typedef instead
        if let Some(td) = env.decls.get_typedef(name) {
            return walk::ty_deps(env, &WalkCtx::plain(), &td.ty, out);
        }
        return Err(ExtractError::DependencyNotFound(format!("type {name}")));
    };

    let ctx = WalkCtx::in_class(name);
    for ancestor in class.ancestors.values() {
        walk::ty_deps(env, &ctx, ancestor, out)?;
    }
    for req in &class.req_ancestors {
        walk::ty_deps(env, &ctx, req, out)?;
    }

    if let Some(enum_ty) = &class.enum_ty {
        walk::ty_deps(env, &ctx, &enum_ty.base, out)?;
        if let Some(constraint) = &enum_ty.constraint {
            walk::ty_deps(env, &ctx, constraint, out)?;
        }
    }

    // default expressions treat any named class as an enum, so every
    // reachable class carries one usable constant into the slice
    if let Some(konst) = class.representative_const() {
        out.push(Dep::Const {
            class: name.to_owned(),
            name: konst.to_owned(),
        });
    }

    // methods satisfying a non-builtin ancestor interface must stay on the
    // generated class
    for ancestor_name in class.ancestors.keys() {
        let Some(ancestor) = env.decls.get_class(ancestor_name) else {
            continue;
        };
        if ancestor.kind != ClassKind::Interface {
            continue;
        }
        if dep::is_builtin(env.decls, &Dep::Class(ancestor_name.clone())) {
            continue;
        }
        for method in ancestor.methods.keys() {
            if class
                .methods
                .get(method)
                .is_some_and(|decl| decl.origin == class.name)
            {
                out.push(Dep::Method {
                    class: name.to_owned(),
                    name: method.clone(),
                });
            }
        }
        for method in ancestor.smethods.keys() {
            if class
                .smethods
                .get(method)
                .is_some_and(|decl| decl.origin == class.name)
            {
                out.push(Dep::SMethod {
                    class: name.to_owned(),
                    name: method.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Partition the closed set. `AllMembers` and `Extends` only drive the
/// closure and are dropped here; members a class inherited without
/// redeclaring are dropped too.
pub fn group(
    env: &ExtractEnv<'_>,
    set: DepSet,
) -> Result<Grouped, ExtractError> {
    let mut grouped = Grouped::default();
    for dep in set {
        match dep {
            Dep::AllMembers(_) | Dep::Extends(_) => {}
            Dep::Class(name) => {
                grouped.types.entry(name).or_default();
            }
            Dep::Fun(name) | Dep::FunName(name) => {
                grouped.globals.insert(Dep::Fun(name));
            }
            Dep::GConst(name) | Dep::GConstName(name) => {
                grouped.globals.insert(Dep::GConst(name));
            }
            Dep::RecordDef(name) => {
                grouped.globals.insert(Dep::RecordDef(name));
            }
            class_bound => {
                let owner = class_bound.owner_class()?.to_owned();
                if declared_here(env, &owner, &class_bound)? {
                    grouped
                        .types
                        .entry(owner)
                        .or_default()
                        .insert(class_bound);
                }
            }
        }
    }
    Ok(grouped)
}

/// Whether `owner` is the origin of the member `dep` names.
fn declared_here(
    env: &ExtractEnv<'_>,
    owner: &str,
    dep: &Dep,
) -> Result<bool, ExtractError> {
    let class = class_or_missing(env, owner)?;
    Ok(match dep {
        Dep::Method { name, .. } => {
            class.methods.get(name).is_some_and(|m| m.origin == owner)
        }
        Dep::SMethod { name, .. } => {
            class.smethods.get(name).is_some_and(|m| m.origin == owner)
        }
        Dep::Prop { name, .. } => {
            class.props.get(name).is_some_and(|p| p.origin == owner)
        }
        Dep::SProp { name, .. } => {
            class.sprops.get(name).is_some_and(|p| p.origin == owner)
        }
        Dep::Const { name, .. } => {
            if let Some(tc) = class.typeconsts.get(name) {
                tc.origin == owner
            } else {
                class.consts.get(name).is_some_and(|c| c.origin == owner)
            }
        }
        // an absent constructor may still be synthesized around collected
        // properties
        Dep::Cstr(_) => {
            class.constructor.as_ref().map(|c| c.origin == owner).unwrap_or(true)
        }
        _ => true,
    })
}
