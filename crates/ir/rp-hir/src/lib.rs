//! Program representation consumed by the reference analysis.
//!
//! This is a deliberately small, name-resolved view of a method body: only
//! the expression shapes a reference can be derived through are modelled
//! precisely, everything else collapses into [`Expr::Opaque`]. Nodes live in
//! arenas owned by the [`Body`] and are addressed by stable ids, so analysis
//! passes only ever hold shared borrows of the program.

pub mod lower;
pub mod surface;
pub mod visitor;

use la_arena::{Arena, Idx};
use rp_intern::{Interner, Symbol};
use rp_span::{FileId, FileSpan};
use serde::{Deserialize, Serialize};

pub use lower::{LowerError, lower_program};

/// HIR node IDs
pub type ExprId = Idx<Expr>;
/// Arena id of a statement.
pub type StmtId = Idx<Stmt>;
/// Arena id of a local declaration.
pub type LocalId = Idx<LocalDecl>;
/// Arena id of a parameter declaration.
pub type ParamId = Idx<ParamDecl>;
/// Arena id of a type definition.
pub type TypeId = Idx<TypeDef>;
/// Arena id of a method definition.
pub type MethodId = Idx<MethodDef>;

/// Name used for the built-in fallback type.
pub const UNKNOWN_TYPE_NAME: &str = "?";

/// A type as far as reference analysis cares about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    /// Type name
    pub name: Symbol,
    /// Whether values of this type own storage that can be reallocated, or
    /// wrap such a value (a handle, view or reference to one).
    pub dyn_sized: bool,
}

/// How the analysis treats calls to a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Returns a reference to one element of the collection passed as the
    /// first argument.
    ElementAccessor,
    /// Exposes the storage of the first argument as a contiguous view.
    ViewConversion,
    /// Narrows a contiguous view passed as the first argument.
    Slice,
    /// Anything else. Only analysable through a declared path template.
    #[default]
    Opaque,
}

/// Method signature information.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Method name
    pub name: Symbol,
    /// Unique signature used as a lookup key, e.g. `List.Get(int)`
    pub signature: String,
    /// Parameter names in argument order (a receiver is the first parameter)
    pub params: Vec<Symbol>,
    /// Recognized helper kind
    pub kind: MethodKind,
    /// Raw tokens of a declared path template, if the method carries one
    pub declared_path: Option<Vec<String>>,
    /// Whether the method returns a reference
    pub returns_ref: bool,
    /// Method body, absent for helpers that are only called
    pub body: Option<Body>,
    /// Source location
    pub span: FileSpan,
}

/// Reference kind of a local variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalKind {
    /// Holds a value. Paths through it are rooted at the local itself.
    #[default]
    Value,
    /// Holds a reference that was bound from some other location.
    Ref,
    /// A locally-held exclusive-access handle.
    ScopeHandle,
}

/// Local variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    /// Variable name
    pub name: Symbol,
    /// Declared type
    pub ty: TypeId,
    /// Reference kind
    pub kind: LocalKind,
    /// Source location
    pub span: FileSpan,
}

impl LocalDecl {
    /// Returns `true` for reference bindings.
    #[must_use]
    pub fn is_ref(&self) -> bool {
        self.kind == LocalKind::Ref
    }
}

/// Method parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    /// Parameter name
    pub name: Symbol,
    /// Declared type
    pub ty: TypeId,
    /// Whether the parameter is passed by reference
    pub by_ref: bool,
    /// Source location
    pub span: FileSpan,
}

/// How an argument is passed to a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgMode {
    /// By value
    #[default]
    Value,
    /// By (mutable) reference
    Ref,
    /// Out-argument, assigned by the callee
    Out,
}

/// Call argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg {
    /// Argument expression
    pub expr: ExprId,
    /// Passing mode
    pub mode: ArgMode,
}

/// Expressions.
///
/// The set of variants is closed: the backward path walk matches on it
/// exhaustively and every shape it cannot see through is [`Expr::Opaque`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal {
        /// Source location
        span: FileSpan,
    },
    /// Local variable reference
    Local {
        /// Referenced local
        local: LocalId,
        /// Source location
        span: FileSpan,
    },
    /// Parameter reference
    Param {
        /// Referenced parameter
        param: ParamId,
        /// Source location
        span: FileSpan,
    },
    /// Field access. A missing receiver means a static field.
    Field {
        /// Owning instance
        receiver: Option<ExprId>,
        /// Field name
        name: Symbol,
        /// Field type
        ty: TypeId,
        /// Source location
        span: FileSpan,
    },
    /// Element access into a contiguous view
    Index {
        /// Indexed view
        receiver: ExprId,
        /// Index operands
        index: Vec<ExprId>,
        /// Element type
        ty: TypeId,
        /// Source location
        span: FileSpan,
    },
    /// Range access on a contiguous view
    Slice {
        /// Sliced view
        receiver: ExprId,
        /// Range operands
        range: Vec<ExprId>,
        /// Resulting view type
        ty: TypeId,
        /// Source location
        span: FileSpan,
    },
    /// The value exposed by an access scope
    ScopeValue {
        /// Access scope
        scope: ExprId,
        /// Exposed value type
        ty: TypeId,
        /// Source location
        span: FileSpan,
    },
    /// Method invocation. The receiver, if any, is the first argument.
    Call {
        /// Invoked method
        method: MethodId,
        /// Arguments
        args: Vec<Arg>,
        /// Return type
        ty: TypeId,
        /// Source location
        span: FileSpan,
    },
    /// Any expression the analysis does not model
    Opaque {
        /// Sub-expressions, in source order
        operands: Vec<ExprId>,
        /// Result type
        ty: TypeId,
        /// Source location
        span: FileSpan,
    },
}

impl Expr {
    /// Source location of the expression.
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Literal { span }
            | Self::Local { span, .. }
            | Self::Param { span, .. }
            | Self::Field { span, .. }
            | Self::Index { span, .. }
            | Self::Slice { span, .. }
            | Self::ScopeValue { span, .. }
            | Self::Call { span, .. }
            | Self::Opaque { span, .. } => *span,
        }
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Local declaration
    Let {
        /// Declared local
        local: LocalId,
        /// Initializer
        init: Option<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// By-reference reassignment of a reference local (`x = ref expr`)
    RefAssign {
        /// Rebound local
        local: LocalId,
        /// New referenced location
        value: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Value assignment through an expression
    Assign {
        /// Assigned location
        target: ExprId,
        /// Assigned value
        value: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Expression statement
    Expr {
        /// Expression
        expr: ExprId,
        /// Source location
        span: FileSpan,
    },
    /// Return statement
    Return {
        /// Returned value
        value: Option<ExprId>,
        /// Source location
        span: FileSpan,
    },
    /// Block of statements
    Block {
        /// Statements, in source order
        stmts: Vec<StmtId>,
        /// Source location
        span: FileSpan,
    },
    /// Conditional
    If {
        /// Condition
        cond: ExprId,
        /// Then branch
        then_branch: StmtId,
        /// Else branch
        else_branch: Option<StmtId>,
        /// Source location
        span: FileSpan,
    },
    /// While loop
    While {
        /// Condition
        cond: ExprId,
        /// Loop body
        body: StmtId,
        /// Source location
        span: FileSpan,
    },
    /// Iteration over a collection, binding `item` once per element
    ForEach {
        /// Per-iteration binding
        item: LocalId,
        /// Iterated collection
        collection: ExprId,
        /// Loop body
        body: StmtId,
        /// Source location
        span: FileSpan,
    },
}

impl Stmt {
    /// Source location of the statement.
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Let { span, .. }
            | Self::RefAssign { span, .. }
            | Self::Assign { span, .. }
            | Self::Expr { span, .. }
            | Self::Return { span, .. }
            | Self::Block { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::ForEach { span, .. } => *span,
        }
    }
}

/// Method body
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Owning method
    pub method: MethodId,
    /// Parameters
    pub params: Arena<ParamDecl>,
    /// Locals
    pub locals: Arena<LocalDecl>,
    /// Expression arena
    pub exprs: Arena<Expr>,
    /// Statement arena
    pub stmts: Arena<Stmt>,
    /// Root statement
    pub root: StmtId,
    /// Source location
    pub span: FileSpan,
}

impl Body {
    /// Creates an empty body whose root is an empty block.
    #[must_use]
    pub fn new(method: MethodId) -> Self {
        let mut stmts = Arena::new();
        let root = stmts.alloc(Stmt::Block {
            stmts: Vec::new(),
            span: FileSpan::dummy(),
        });

        Self {
            method,
            params: Arena::new(),
            locals: Arena::new(),
            exprs: Arena::new(),
            stmts,
            root,
            span: FileSpan::dummy(),
        }
    }

    /// Static type of an expression.
    ///
    /// Literals carry no type.
    #[must_use]
    pub fn expr_ty(&self, expr: ExprId) -> Option<TypeId> {
        match &self.exprs[expr] {
            Expr::Literal { .. } => None,
            Expr::Local { local, .. } => Some(self.locals[*local].ty),
            Expr::Param { param, .. } => Some(self.params[*param].ty),
            Expr::Field { ty, .. }
            | Expr::Index { ty, .. }
            | Expr::Slice { ty, .. }
            | Expr::ScopeValue { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::Opaque { ty, .. } => Some(*ty),
        }
    }

    /// The local an expression directly names, if any.
    #[must_use]
    pub fn as_local(&self, expr: ExprId) -> Option<LocalId> {
        match self.exprs[expr] {
            Expr::Local { local, .. } => Some(local),
            _ => None,
        }
    }

    /// Finds a local by name.
    #[must_use]
    pub fn local_named(&self, name: Symbol) -> Option<LocalId> {
        self.locals
            .iter()
            .find(|(_, decl)| decl.name == name)
            .map(|(id, _)| id)
    }
}

/// A lowered program: types, methods and their bodies.
#[derive(Debug, Clone)]
pub struct ProgramDb {
    /// Interner shared by every symbol in the program
    pub interner: Interner,
    /// File the program was lowered from
    pub file: FileId,
    /// Type definitions
    pub types: Arena<TypeDef>,
    /// Method definitions
    pub methods: Arena<MethodDef>,
    unknown_ty: TypeId,
}

impl ProgramDb {
    /// Creates an empty program containing only the fallback type.
    #[must_use]
    pub fn new(file: FileId) -> Self {
        let interner = Interner::new();
        let mut types = Arena::new();
        let unknown_ty = types.alloc(TypeDef {
            name: interner.intern(UNKNOWN_TYPE_NAME),
            dyn_sized: false,
        });

        Self {
            interner,
            file,
            types,
            methods: Arena::new(),
            unknown_ty,
        }
    }

    /// The fixed-size fallback type given to nodes without a declared type.
    #[must_use]
    pub fn unknown_ty(&self) -> TypeId {
        self.unknown_ty
    }

    /// Returns `true` if the type is dynamically sized or wraps such a type.
    #[must_use]
    pub fn is_dyn_sized(&self, ty: TypeId) -> bool {
        self.types[ty].dyn_sized
    }

    /// Resolves a symbol to its text.
    #[must_use]
    pub fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(&sym)
    }

    /// Finds a method by signature, falling back to its bare name.
    #[must_use]
    pub fn method_by_signature(&self, signature: &str) -> Option<MethodId> {
        self.methods
            .iter()
            .find(|(_, def)| def.signature == signature)
            .or_else(|| {
                self.methods
                    .iter()
                    .find(|(_, def)| self.name(def.name) == signature)
            })
            .map(|(id, _)| id)
    }

    /// Iterates methods that have a body.
    pub fn bodies(&self) -> impl Iterator<Item = (MethodId, &Body)> {
        self.methods
            .iter()
            .filter_map(|(id, def)| def.body.as_ref().map(|body| (id, body)))
    }

    /// Body of a method, if it has one.
    #[must_use]
    pub fn body(&self, method: MethodId) -> Option<&Body> {
        self.methods[method].body.as_ref()
    }

    /// Finds the body of the method with the given name or signature.
    #[must_use]
    pub fn body_named(&self, name: &str) -> Option<&Body> {
        self.method_by_signature(name).and_then(|id| self.body(id))
    }
}
