//! In-memory collaborator fixtures shared by the extraction tests.
//!
//! `FixtureWorld` implements every collaborator trait over hand-built decl
//! tables: the checker replays a fixed edge list through the registered
//! callback, the printer renders types structurally, the reader serves
//! in-memory sources and the formatter is the identity (or a simulated
//! failure). Extractions are serialized behind one lock because the
//! dependency callback slot is process-global.

#![allow(dead_code)]

use parking_lot::Mutex;
use standalone_extractor::{
    ClassConst, ClassDecl, ClassKind, DeclProvider, Dep, DepSet, EnumTy,
    Entry, ExtractEnv, ExtractError, Formatter, FunDecl, FunParam, FunTy,
    GConstDecl, MethodDecl, Pos, Prim, PropDecl, SourceReader, Tparam, Ty,
    TypeChecker, TypeConst, TypePrinter, TypedefDecl, Visibility,
    emit_dependency, extract, go,
};
use std::collections::BTreeMap;
use std::sync::Arc;

static EXTRACTION_LOCK: Mutex<()> = Mutex::new(());

pub const BUILTIN_FILE: &str = "builtins.hhi";

pub fn pos(file: &str) -> Pos {
    Pos { file: file.to_owned(), start: 0, end: 0 }
}

pub fn prim(prim: Prim) -> Ty {
    Ty::Prim(prim)
}

pub fn apply(name: &str) -> Ty {
    Ty::apply(name, vec![])
}

pub fn param(name: &str, ty: Ty) -> FunParam {
    FunParam { name: name.to_owned(), ty, inout: false }
}

/// Function type with every parameter required.
pub fn fun_ty(params: Vec<FunParam>, ret: Ty) -> FunTy {
    let min_arity = params.len();
    FunTy { tparams: vec![], params, min_arity, variadic: None, ret }
}

/// Builder for class fixtures; members default to public, concrete, and
/// originating in the class itself.
pub struct ClassFixture {
    decl: ClassDecl,
    bodies: Vec<(String, String)>,
}

impl ClassFixture {
    pub fn new(name: &str, kind: ClassKind, file: &str) -> Self {
        Self {
            decl: ClassDecl {
                name: name.to_owned(),
                pos: pos(file),
                kind,
                tparams: vec![],
                ancestors: BTreeMap::new(),
                req_ancestors: vec![],
                consts: BTreeMap::new(),
                typeconsts: BTreeMap::new(),
                props: BTreeMap::new(),
                sprops: BTreeMap::new(),
                methods: BTreeMap::new(),
                smethods: BTreeMap::new(),
                constructor: None,
                enum_ty: None,
            },
            bodies: vec![],
        }
    }

    pub fn builtin(name: &str, kind: ClassKind) -> Self {
        Self::new(name, kind, BUILTIN_FILE)
    }

    pub fn tparam(mut self, name: &str) -> Self {
        self.decl.tparams.push(Tparam::new(name));
        self
    }

    pub fn ancestor(mut self, name: &str, ty: Ty) -> Self {
        self.decl.ancestors.insert(name.to_owned(), ty);
        self
    }

    pub fn require(mut self, ty: Ty) -> Self {
        self.decl.req_ancestors.push(ty);
        self
    }

    pub fn konst(mut self, name: &str, ty: Ty) -> Self {
        self.decl.consts.insert(
            name.to_owned(),
            ClassConst {
                origin: self.decl.name.clone(),
                is_abstract: false,
                ty,
            },
        );
        self
    }

    pub fn typeconst(
        mut self,
        name: &str,
        constraint: Option<Ty>,
        ty: Option<Ty>,
    ) -> Self {
        let is_abstract = ty.is_none();
        self.decl.typeconsts.insert(
            name.to_owned(),
            TypeConst {
                origin: self.decl.name.clone(),
                is_abstract,
                constraint,
                ty,
            },
        );
        self
    }

    pub fn prop(mut self, name: &str, ty: Ty) -> Self {
        let origin = self.decl.name.clone();
        self.decl.props.insert(
            name.to_owned(),
            PropDecl {
                origin,
                visibility: Visibility::Public,
                is_abstract: false,
                ty,
            },
        );
        self
    }

    pub fn prop_from(mut self, origin: &str, name: &str, ty: Ty) -> Self {
        self.decl.props.insert(
            name.to_owned(),
            PropDecl {
                origin: origin.to_owned(),
                visibility: Visibility::Public,
                is_abstract: false,
                ty,
            },
        );
        self
    }

    pub fn sprop(mut self, name: &str, ty: Ty) -> Self {
        let origin = self.decl.name.clone();
        self.decl.sprops.insert(
            name.to_owned(),
            PropDecl {
                origin,
                visibility: Visibility::Public,
                is_abstract: false,
                ty,
            },
        );
        self
    }

    fn method_decl(&self, is_abstract: bool, ty: FunTy) -> MethodDecl {
        MethodDecl {
            origin: self.decl.name.clone(),
            pos: pos(&self.decl.pos.file),
            visibility: Visibility::Public,
            is_abstract,
            ty,
        }
    }

    pub fn method(mut self, name: &str, ty: FunTy) -> Self {
        let decl = self.method_decl(false, ty);
        self.decl.methods.insert(name.to_owned(), decl);
        self
    }

    pub fn abstract_method(mut self, name: &str, ty: FunTy) -> Self {
        let decl = self.method_decl(true, ty);
        self.decl.methods.insert(name.to_owned(), decl);
        self
    }

    pub fn method_from(mut self, origin: &str, name: &str, ty: FunTy) -> Self {
        let mut decl = self.method_decl(false, ty);
        decl.origin = origin.to_owned();
        self.decl.methods.insert(name.to_owned(), decl);
        self
    }

    /// Method whose literal source text the reader can serve.
    pub fn method_with_body(mut self, name: &str, ty: FunTy, body: &str) -> Self {
        let decl = self.method_decl(false, ty);
        self.decl.methods.insert(name.to_owned(), decl);
        self.bodies.push((name.to_owned(), body.to_owned()));
        self
    }

    pub fn smethod(mut self, name: &str, ty: FunTy) -> Self {
        let decl = self.method_decl(false, ty);
        self.decl.smethods.insert(name.to_owned(), decl);
        self
    }

    pub fn smethod_with_body(
        mut self,
        name: &str,
        ty: FunTy,
        body: &str,
    ) -> Self {
        let decl = self.method_decl(false, ty);
        self.decl.smethods.insert(name.to_owned(), decl);
        self.bodies.push((name.to_owned(), body.to_owned()));
        self
    }

    pub fn constructor(mut self, ty: FunTy) -> Self {
        self.decl.constructor = Some(self.method_decl(false, ty));
        self
    }

    pub fn enum_of(mut self, base: Ty) -> Self {
        self.decl.enum_ty = Some(EnumTy { base, constraint: None });
        self
    }
}

/// In-memory world serving every collaborator role.
#[derive(Default)]
pub struct FixtureWorld {
    funs: BTreeMap<String, Arc<FunDecl>>,
    classes: BTreeMap<String, Arc<ClassDecl>>,
    typedefs: BTreeMap<String, Arc<TypedefDecl>>,
    gconsts: BTreeMap<String, Arc<GConstDecl>>,
    sources: BTreeMap<String, String>,
    edges: Vec<(Dep, Dep)>,
    fail_format: bool,
}

impl FixtureWorld {
    /// A world pre-seeded with the standard-library container classes the
    /// header-interface set always declares.
    pub fn new() -> Self {
        let mut world = Self::default();
        for name in [
            "\\HH\\vec",
            "\\HH\\dict",
            "\\HH\\keyset",
            "\\HH\\varray",
            "\\HH\\darray",
            "\\HH\\Vector",
            "\\HH\\ImmVector",
            "\\HH\\Map",
            "\\HH\\ImmMap",
            "\\HH\\Set",
            "\\HH\\ImmSet",
            "\\HH\\Pair",
            "\\HH\\classname",
            "\\HH\\Traversable",
        ] {
            world.add_class(ClassFixture::builtin(name, ClassKind::Class));
        }
        world
    }

    pub fn with_failing_formatter(mut self) -> Self {
        self.fail_format = true;
        self
    }

    /// Register a function whose literal body the reader serves verbatim.
    pub fn add_fun(&mut self, name: &str, file: &str, ty: FunTy, body: &str) {
        self.sources.insert(file.to_owned(), body.to_owned());
        self.funs.insert(
            name.to_owned(),
            Arc::new(FunDecl {
                name: name.to_owned(),
                pos: Pos { file: file.to_owned(), start: 0, end: body.len() },
                ty,
            }),
        );
    }

    pub fn add_builtin_fun(&mut self, name: &str, ty: FunTy) {
        self.funs.insert(
            name.to_owned(),
            Arc::new(FunDecl {
                name: name.to_owned(),
                pos: pos(BUILTIN_FILE),
                ty,
            }),
        );
    }

    pub fn add_class(&mut self, fixture: ClassFixture) {
        let ClassFixture { mut decl, bodies } = fixture;
        for (method, body) in bodies {
            let file = format!("{}::{}", decl.name, method);
            let span = Pos { file: file.clone(), start: 0, end: body.len() };
            if let Some(entry) = decl.methods.get_mut(&method) {
                entry.pos = span;
            } else if let Some(entry) = decl.smethods.get_mut(&method) {
                entry.pos = span;
            }
            self.sources.insert(file, body);
        }
        self.classes.insert(decl.name.clone(), Arc::new(decl));
    }

    pub fn add_typedef(
        &mut self,
        name: &str,
        file: &str,
        ty: Ty,
        transparent: bool,
    ) {
        self.typedefs.insert(
            name.to_owned(),
            Arc::new(TypedefDecl {
                name: name.to_owned(),
                pos: pos(file),
                tparams: vec![],
                ty,
                transparent,
            }),
        );
    }

    pub fn add_gconst(&mut self, name: &str, file: &str, ty: Ty) {
        self.gconsts.insert(
            name.to_owned(),
            Arc::new(GConstDecl { name: name.to_owned(), pos: pos(file), ty }),
        );
    }

    /// Dependency edge the checker will report during collection.
    pub fn edge(&mut self, source: Dep, target: Dep) {
        self.edges.push((source, target));
    }

    fn replay_edges(&self) {
        for (source, target) in &self.edges {
            emit_dependency(source, target);
        }
    }

    /// Run one request end to end, returning the user-visible text.
    pub fn extract(&self, request: &str) -> String {
        let _serial = EXTRACTION_LOCK.lock();
        go(&self.env(), request)
    }

    /// Run one already-parsed entry, keeping the structured error.
    pub fn run_entry(&self, entry: &Entry) -> Result<String, ExtractError> {
        let _serial = EXTRACTION_LOCK.lock();
        extract(&self.env(), entry)
    }

    /// Collection + closure only.
    pub fn collected(&self, entry: &Entry) -> Result<DepSet, ExtractError> {
        let _serial = EXTRACTION_LOCK.lock();
        standalone_extractor::collect::collect(&self.env(), entry)
    }

    fn env(&self) -> ExtractEnv<'_> {
        ExtractEnv {
            decls: self,
            checker: self,
            printer: self,
            reader: self,
            formatter: self,
        }
    }
}

impl DeclProvider for FixtureWorld {
    fn get_fun(&self, name: &str) -> Option<Arc<FunDecl>> {
        self.funs.get(name).cloned()
    }
    fn get_class(&self, name: &str) -> Option<Arc<ClassDecl>> {
        self.classes.get(name).cloned()
    }
    fn get_typedef(&self, name: &str) -> Option<Arc<TypedefDecl>> {
        self.typedefs.get(name).cloned()
    }
    fn get_gconst(&self, name: &str) -> Option<Arc<GConstDecl>> {
        self.gconsts.get(name).cloned()
    }
}

impl TypeChecker for FixtureWorld {
    fn type_fun(&self, _file: &str, _name: &str) {
        self.replay_edges();
    }
    fn type_class(&self, _file: &str, _name: &str) {
        self.replay_edges();
    }
}

impl TypePrinter for FixtureWorld {
    fn full_decl(&self, ty: &Ty) -> String {
        print_ty(ty)
    }
}

impl SourceReader for FixtureWorld {
    fn read(&self, file: &str) -> Option<String> {
        self.sources.get(file).cloned()
    }
}

impl Formatter for FixtureWorld {
    fn format(&self, text: &str) -> Result<String, String> {
        if self.fail_format {
            Err("simulated formatter failure".to_owned())
        } else {
            Ok(text.to_owned())
        }
    }
}

/// Structural rendering of a declared type in source syntax.
pub fn print_ty(ty: &Ty) -> String {
    match ty {
        Ty::Prim(prim) => prim_name(prim).to_owned(),
        Ty::Nullable(inner) => format!("?{}", print_ty(inner)),
        Ty::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(print_ty).collect();
            format!("({})", parts.join(", "))
        }
        Ty::Shape { open, fields } => {
            let mut parts: Vec<String> = fields
                .iter()
                .map(|field| {
                    format!(
                        "{}'{}' => {}",
                        if field.optional { "?" } else { "" },
                        field.name,
                        print_ty(&field.ty)
                    )
                })
                .collect();
            if *open {
                parts.push("...".to_owned());
            }
            format!("shape({})", parts.join(", "))
        }
        Ty::Apply { name, args } => {
            let base = display_name(name);
            if args.is_empty() {
                base
            } else {
                let parts: Vec<String> = args.iter().map(print_ty).collect();
                format!("{base}<{}>", parts.join(", "))
            }
        }
        Ty::Access { root, path } => {
            format!("{}::{}", print_ty(root), path.join("::"))
        }
        Ty::Generic(name) => name.clone(),
        Ty::Fun(fun) => {
            let params: Vec<String> =
                fun.params.iter().map(|p| print_ty(&p.ty)).collect();
            format!(
                "(function({}): {})",
                params.join(", "),
                print_ty(&fun.ret)
            )
        }
        Ty::Mixed => "mixed".to_owned(),
        Ty::Any => "_".to_owned(),
    }
}

fn display_name(name: &str) -> String {
    let bare = name.strip_prefix('\\').unwrap_or(name);
    match bare.strip_prefix("HH\\") {
        Some(short) => short.to_owned(),
        None => name.to_owned(),
    }
}

fn prim_name(prim: &Prim) -> &'static str {
    match prim {
        Prim::Null => "null",
        Prim::Int => "int",
        Prim::Bool => "bool",
        Prim::Float => "float",
        Prim::String => "string",
        Prim::Arraykey => "arraykey",
        Prim::Num => "num",
        Prim::Void => "void",
        Prim::Resource => "resource",
        Prim::Noreturn => "noreturn",
    }
}
