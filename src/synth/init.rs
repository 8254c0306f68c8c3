//! Default expressions: a source-level value the type system accepts as an
//! instance of a declared type.

use crate::decl::{Prim, Ty, short_name, strip_root};
use crate::error::ExtractError;
use crate::providers::DeclProvider;

/// Produce a default expression for `ty`.
///
/// Named class types with no special handling are treated as enums: any
/// constant other than the reserved `class` identifier will do, and the
/// first one in the member table is taken. Typedefs recurse into their
/// target type.
pub fn initial_value(
    decls: &dyn DeclProvider,
    ty: &Ty,
) -> Result<String, ExtractError> {
    match ty {
        Ty::Nullable(_) => Ok("null".to_owned()),
        Ty::Prim(prim) => prim_value(prim),
        Ty::Tuple(items) => {
            let parts = items
                .iter()
                .map(|item| initial_value(decls, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("tuple({})", parts.join(", ")))
        }
        Ty::Shape { open, fields } => {
            let mut parts = Vec::new();
            for field in fields {
                if field.optional {
                    continue;
                }
                parts.push(format!(
                    "'{}' => {}",
                    field.name,
                    initial_value(decls, &field.ty)?
                ));
            }
            if *open {
                parts.push("...".to_owned());
            }
            Ok(format!("shape({})", parts.join(", ")))
        }
        Ty::Apply { name, args } => apply_value(decls, name, args),
        Ty::Generic(_)
        | Ty::Access { .. }
        | Ty::Fun(_)
        | Ty::Mixed
        | Ty::Any => Err(ExtractError::unsupported(format!(
            "no default value for type {ty:?}"
        ))),
    }
}

fn prim_value(prim: &Prim) -> Result<String, ExtractError> {
    match prim {
        Prim::Null => Ok("null".to_owned()),
        Prim::Int | Prim::Num => Ok("0".to_owned()),
        Prim::Bool => Ok("false".to_owned()),
        Prim::Float => Ok("0.0".to_owned()),
        Prim::String | Prim::Arraykey => Ok("\"\"".to_owned()),
        Prim::Void | Prim::Resource | Prim::Noreturn => {
            Err(ExtractError::unsupported(format!(
                "no default value for primitive {prim:?}"
            )))
        }
    }
}

fn apply_value(
    decls: &dyn DeclProvider,
    name: &str,
    args: &[Ty],
) -> Result<String, ExtractError> {
    match strip_root(name) {
        "HH\\vec" => Ok("vec[]".to_owned()),
        "HH\\keyset" => Ok("keyset[]".to_owned()),
        "HH\\dict" => Ok("dict[]".to_owned()),
        "HH\\varray" => Ok("varray[]".to_owned()),
        "HH\\darray" => Ok("darray[]".to_owned()),
        "HH\\Vector" | "HH\\ImmVector" | "HH\\Map" | "HH\\ImmMap"
        | "HH\\Set" | "HH\\ImmSet" => {
            Ok(format!("{} {{}}", short_name(name)))
        }
        "HH\\Pair" => match args {
            [first, second] => Ok(format!(
                "Pair {{{}, {}}}",
                initial_value(decls, first)?,
                initial_value(decls, second)?
            )),
            _ => Err(ExtractError::unexpected(
                "pair type without exactly two arguments",
            )),
        },
        "HH\\classname" => match args {
            [Ty::Apply { name: class, .. }] => Ok(format!("{class}::class")),
            _ => Err(ExtractError::unsupported(
                "classname without a concrete class argument",
            )),
        },
        _ => {
            if let Some(class) = decls.get_class(name) {
                match class.representative_const() {
                    Some(konst) => Ok(format!("{name}::{konst}")),
                    None => Err(ExtractError::unsupported(format!(
                        "no usable constant on {name}"
                    ))),
                }
            } else if let Some(td) = decls.get_typedef(name) {
                initial_value(decls, &td.ty)
            } else {
                Err(ExtractError::DependencyNotFound(format!("type {name}")))
            }
        }
    }
}
