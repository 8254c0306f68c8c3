//! Collaborator services the extractor drives, plus the named dependency
//! callback slot the type-checker reports edges through.
//!
//! The callback slot is process-global state, mirroring the host checker's
//! registration interface. Registration is a scoped guard: dropping the
//! guard deregisters, and concurrent registration is refused.

use crate::decl::{ClassDecl, FunDecl, GConstDecl, Pos, Ty, TypedefDecl};
use crate::dep::Dep;
use crate::error::ExtractError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Serves declarations by fully qualified name.
pub trait DeclProvider {
    fn get_fun(&self, name: &str) -> Option<Arc<FunDecl>>;
    fn get_class(&self, name: &str) -> Option<Arc<ClassDecl>>;
    fn get_typedef(&self, name: &str) -> Option<Arc<TypedefDecl>>;
    fn get_gconst(&self, name: &str) -> Option<Arc<GConstDecl>>;
}

/// The host type-checker. Checking a declaration reports every dependency
/// edge it records through [`emit_dependency`].
pub trait TypeChecker {
    fn type_fun(&self, file: &str, name: &str);
    fn type_class(&self, file: &str, name: &str);
}

/// External type pretty-printer.
pub trait TypePrinter {
    fn full_decl(&self, ty: &Ty) -> String;
}

/// Whole-file and span-level access to original source text.
pub trait SourceReader {
    fn read(&self, file: &str) -> Option<String>;

    fn text_at(&self, pos: &Pos) -> Option<String> {
        let source = self.read(&pos.file)?;
        source.get(pos.start..pos.end).map(str::to_owned)
    }
}

/// Best-effort source formatter.
pub trait Formatter {
    fn format(&self, text: &str) -> Result<String, String>;
}

/// Name under which the extraction callback is registered.
pub const DEPENDENCY_CALLBACK: &str = "add_dependency";

type DepCallback = Box<dyn FnMut(&Dep, &Dep) + Send>;

static CALLBACK_SLOT: Mutex<Option<DepCallback>> = Mutex::new(None);

/// Keeps the dependency callback installed; deregisters on drop.
pub struct CallbackGuard {
    _private: (),
}

/// Install the named edge callback for the duration of a collection phase.
///
/// Fails if another extraction currently holds the slot; concurrent
/// extractions in one process are not supported.
pub fn add_dependency_callback(
    name: &str,
    callback: DepCallback,
) -> Result<CallbackGuard, ExtractError> {
    if name != DEPENDENCY_CALLBACK {
        return Err(ExtractError::unexpected(format!(
            "unknown dependency callback `{name}`"
        )));
    }
    let mut slot = CALLBACK_SLOT.lock();
    if slot.is_some() {
        return Err(ExtractError::unsupported(
            "a dependency callback is already registered; \
             concurrent extraction is not supported",
        ));
    }
    *slot = Some(callback);
    Ok(CallbackGuard { _private: () })
}

impl Drop for CallbackGuard {
    fn drop(&mut self) {
        *CALLBACK_SLOT.lock() = None;
    }
}

/// Report one recorded dependency edge. Called by checker implementations
/// while a collection phase is active; a no-op otherwise.
pub fn emit_dependency(source: &Dep, target: &Dep) {
    if let Some(callback) = CALLBACK_SLOT.lock().as_mut() {
        callback(source, target);
    }
}
