//! Signature walks: traverse a declared type and report every dependency
//! node it reaches.

use crate::decl::{FunTy, Ty};
use crate::dep::Dep;
use crate::error::ExtractError;
use crate::extract::ExtractEnv;

/// Context carried through one signature walk.
#[derive(Debug, Clone, Default)]
pub struct WalkCtx {
    /// Set while walking the outermost type of a constant: the constant's
    /// initializer will need a concrete value of that type, so the walk
    /// records one representative class constant. Cleared on any descent.
    pub for_const: bool,
    /// Class whose `this` the walked signature may refer to.
    pub this_class: Option<String>,
}

impl WalkCtx {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn in_class(class: &str) -> Self {
        Self { for_const: false, this_class: Some(class.to_owned()) }
    }

    pub fn constant(this_class: Option<&str>) -> Self {
        Self { for_const: true, this_class: this_class.map(str::to_owned) }
    }

    fn nested(&self) -> Self {
        Self { for_const: false, this_class: self.this_class.clone() }
    }
}

pub fn ty_deps(
    env: &ExtractEnv<'_>,
    ctx: &WalkCtx,
    ty: &Ty,
    out: &mut Vec<Dep>,
) -> Result<(), ExtractError> {
    match ty {
        Ty::Prim(_) | Ty::Generic(_) | Ty::Mixed | Ty::Any => Ok(()),
        Ty::Nullable(inner) => ty_deps(env, &ctx.nested(), inner, out),
        Ty::Tuple(items) => {
            for item in items {
                ty_deps(env, &ctx.nested(), item, out)?;
            }
            Ok(())
        }
        Ty::Shape { fields, .. } => {
            for field in fields {
                ty_deps(env, &ctx.nested(), &field.ty, out)?;
            }
            Ok(())
        }
        Ty::Fun(fun) => fun_ty_deps(env, &ctx.nested(), fun, out),
        Ty::Apply { name, args } => {
            out.push(Dep::Class(name.clone()));
            if ctx.for_const && env.decls.get_typedef(name).is_none() {
                if let Some(class) = env.decls.get_class(name) {
                    if let Some(konst) = class.representative_const() {
                        out.push(Dep::Const {
                            class: name.clone(),
                            name: konst.to_owned(),
                        });
                    }
                }
            }
            for arg in args {
                ty_deps(env, &ctx.nested(), arg, out)?;
            }
            Ok(())
        }
        Ty::Access { root, path } => access_deps(env, ctx, root, path, out),
    }
}

pub fn fun_ty_deps(
    env: &ExtractEnv<'_>,
    ctx: &WalkCtx,
    fun: &FunTy,
    out: &mut Vec<Dep>,
) -> Result<(), ExtractError> {
    for param in &fun.params {
        ty_deps(env, ctx, &param.ty, out)?;
    }
    if let Some(variadic) = &fun.variadic {
        ty_deps(env, ctx, &variadic.ty, out)?;
    }
    ty_deps(env, ctx, &fun.ret, out)
}

/// Walk a type-constant access chain, recording one `Const` edge per hop.
///
/// Each hop resolves the next identifier within the current apply type and
/// then continues into the type constant's own type, rebinding `this`.
fn access_deps(
    env: &ExtractEnv<'_>,
    ctx: &WalkCtx,
    root: &Ty,
    path: &[String],
    out: &mut Vec<Dep>,
) -> Result<(), ExtractError> {
    let mut current = root.clone();
    for id in path {
        let class_name = match &current {
            Ty::Apply { name, .. } => name.clone(),
            Ty::Generic(g) if g == "this" => {
                ctx.this_class.clone().ok_or_else(|| {
                    ExtractError::unexpected(
                        "type access rooted at `this` outside a class",
                    )
                })?
            }
            _ => {
                return Err(ExtractError::unsupported(
                    "type access through a non-class type",
                ));
            }
        };
        out.push(Dep::Class(class_name.clone()));
        let class = env.decls.get_class(&class_name).ok_or_else(|| {
            ExtractError::DependencyNotFound(format!("type {class_name}"))
        })?;
        let typeconst = class.typeconsts.get(id).ok_or_else(|| {
            ExtractError::DependencyNotFound(format!(
                "type constant {class_name}::{id}"
            ))
        })?;
        out.push(Dep::Const { class: class_name, name: id.clone() });
        match typeconst.ty.as_ref().or(typeconst.constraint.as_ref()) {
            Some(next) => current = next.clone(),
            None => break,
        }
    }
    Ok(())
}
