//! Serializable tree form of a program.
//!
//! Hosts hand the analysis a [`ProgramDoc`]: a nested JSON-friendly tree
//! that refers to types, locals and methods by name. [`crate::lower_program`]
//! turns it into arena form. The constructor helpers on [`ExprDoc`] and
//! [`StmtDoc`] keep hand-written documents (tests, fixtures) short.

use serde::{Deserialize, Serialize};

use crate::{ArgMode, LocalKind, MethodKind};

/// A whole program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramDoc {
    /// File id spans are attributed to
    #[serde(default)]
    pub file: u32,
    /// Type declarations
    #[serde(default)]
    pub types: Vec<TypeDoc>,
    /// Method declarations, with or without bodies
    #[serde(default)]
    pub methods: Vec<MethodDoc>,
}

/// A type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDoc {
    /// Type name
    pub name: String,
    /// Dynamically sized, or wraps a dynamically sized value
    #[serde(default)]
    pub dyn_sized: bool,
}

/// A method declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodDoc {
    /// Method name
    pub name: String,
    /// Lookup signature; defaults to the name
    #[serde(default)]
    pub signature: Option<String>,
    /// Parameters in argument order
    #[serde(default)]
    pub params: Vec<ParamDoc>,
    /// Recognized helper kind
    #[serde(default)]
    pub kind: MethodKind,
    /// Declared path template tokens
    #[serde(default)]
    pub path: Option<Vec<String>>,
    /// Whether the method returns a reference
    #[serde(default)]
    pub returns_ref: bool,
    /// Local declarations used by the body
    #[serde(default)]
    pub locals: Vec<LocalDoc>,
    /// Body statements; `None` for methods that are only called
    #[serde(default)]
    pub body: Option<Vec<StmtDoc>>,
}

/// A parameter declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDoc {
    /// Parameter name
    pub name: String,
    /// Type name
    #[serde(default)]
    pub ty: Option<String>,
    /// Passed by reference
    #[serde(default)]
    pub by_ref: bool,
}

/// A local declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDoc {
    /// Local name
    pub name: String,
    /// Type name
    #[serde(default)]
    pub ty: Option<String>,
    /// Reference kind
    #[serde(default)]
    pub kind: LocalKind,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum StmtDoc {
    /// `let local = init`
    Let {
        /// Declared local
        local: String,
        /// Initializer
        #[serde(default)]
        init: Option<ExprDoc>,
    },
    /// `local = ref value`
    RefAssign {
        /// Rebound local
        local: String,
        /// New referenced location
        value: ExprDoc,
    },
    /// `target = value`
    Assign {
        /// Assigned location
        target: ExprDoc,
        /// Assigned value
        value: ExprDoc,
    },
    /// Expression statement
    Expr {
        /// Expression
        expr: ExprDoc,
    },
    /// `return value`
    Return {
        /// Returned value
        #[serde(default)]
        value: Option<ExprDoc>,
    },
    /// Nested block
    Block {
        /// Statements
        stmts: Vec<StmtDoc>,
    },
    /// Conditional
    If {
        /// Condition
        cond: ExprDoc,
        /// Then branch
        then: Vec<StmtDoc>,
        /// Else branch
        #[serde(default)]
        otherwise: Option<Vec<StmtDoc>>,
    },
    /// While loop
    While {
        /// Condition
        cond: ExprDoc,
        /// Loop body
        body: Vec<StmtDoc>,
    },
    /// `for item in collection`
    ForEach {
        /// Per-iteration local
        item: String,
        /// Iterated collection
        collection: ExprDoc,
        /// Loop body
        body: Vec<StmtDoc>,
    },
}

impl StmtDoc {
    /// `let local = init`
    #[must_use]
    pub fn let_(local: &str, init: ExprDoc) -> Self {
        Self::Let {
            local: local.to_string(),
            init: Some(init),
        }
    }

    /// `local = ref value`
    #[must_use]
    pub fn ref_assign(local: &str, value: ExprDoc) -> Self {
        Self::RefAssign {
            local: local.to_string(),
            value,
        }
    }

    /// Expression statement
    #[must_use]
    pub fn expr(expr: ExprDoc) -> Self {
        Self::Expr { expr }
    }

    /// `return value`
    #[must_use]
    pub fn ret(value: ExprDoc) -> Self {
        Self::Return { value: Some(value) }
    }

    /// `for item in collection { body }`
    #[must_use]
    pub fn for_each(item: &str, collection: ExprDoc, body: Vec<StmtDoc>) -> Self {
        Self::ForEach {
            item: item.to_string(),
            collection,
            body,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expr", rename_all = "snake_case")]
pub enum ExprDoc {
    /// Literal
    Literal,
    /// Local or parameter, resolved by name
    Name {
        /// Variable name
        name: String,
    },
    /// Field access
    Field {
        /// Owning instance; absent for static fields
        #[serde(default)]
        receiver: Option<Box<ExprDoc>>,
        /// Field name
        name: String,
        /// Field type name
        #[serde(default)]
        ty: Option<String>,
    },
    /// Element access
    Index {
        /// Indexed view
        receiver: Box<ExprDoc>,
        /// Index operands
        #[serde(default)]
        index: Vec<ExprDoc>,
        /// Element type name
        #[serde(default)]
        ty: Option<String>,
    },
    /// Range access
    Slice {
        /// Sliced view
        receiver: Box<ExprDoc>,
        /// Range operands
        #[serde(default)]
        range: Vec<ExprDoc>,
        /// View type name
        #[serde(default)]
        ty: Option<String>,
    },
    /// Value exposed by an access scope
    ScopeValue {
        /// Access scope
        scope: Box<ExprDoc>,
        /// Value type name
        #[serde(default)]
        ty: Option<String>,
    },
    /// Method call
    Call {
        /// Method signature or name
        method: String,
        /// Arguments, receiver first
        #[serde(default)]
        args: Vec<ArgDoc>,
        /// Return type name
        #[serde(default)]
        ty: Option<String>,
    },
    /// Unmodelled expression
    Opaque {
        /// Sub-expressions
        #[serde(default)]
        operands: Vec<ExprDoc>,
        /// Result type name
        #[serde(default)]
        ty: Option<String>,
    },
}

impl ExprDoc {
    /// Variable reference
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self::Name {
            name: name.to_string(),
        }
    }

    /// Static field access
    #[must_use]
    pub fn static_field(name: &str, ty: Option<&str>) -> Self {
        Self::Field {
            receiver: None,
            name: name.to_string(),
            ty: ty.map(str::to_string),
        }
    }

    /// `self.name` with a fixed-size type
    #[must_use]
    pub fn field(self, name: &str) -> Self {
        self.field_of(name, None)
    }

    /// `self.name` of the given type
    #[must_use]
    pub fn field_of(self, name: &str, ty: Option<&str>) -> Self {
        Self::Field {
            receiver: Some(Box::new(self)),
            name: name.to_string(),
            ty: ty.map(str::to_string),
        }
    }

    /// `self[index]` producing an element of the given type
    #[must_use]
    pub fn index(self, index: ExprDoc, ty: Option<&str>) -> Self {
        Self::Index {
            receiver: Box::new(self),
            index: vec![index],
            ty: ty.map(str::to_string),
        }
    }

    /// `self[range]`
    #[must_use]
    pub fn slice(self, range: Vec<ExprDoc>, ty: Option<&str>) -> Self {
        Self::Slice {
            receiver: Box::new(self),
            range,
            ty: ty.map(str::to_string),
        }
    }

    /// Value exposed by the access scope `self`
    #[must_use]
    pub fn scope_value(self, ty: Option<&str>) -> Self {
        Self::ScopeValue {
            scope: Box::new(self),
            ty: ty.map(str::to_string),
        }
    }

    /// Method call
    #[must_use]
    pub fn call(method: &str, args: Vec<ArgDoc>, ty: Option<&str>) -> Self {
        Self::Call {
            method: method.to_string(),
            args,
            ty: ty.map(str::to_string),
        }
    }

    /// Unmodelled expression over `operands`
    #[must_use]
    pub fn opaque(operands: Vec<ExprDoc>) -> Self {
        Self::Opaque { operands, ty: None }
    }
}

/// A call argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgDoc {
    /// Argument expression
    pub expr: ExprDoc,
    /// Passing mode
    #[serde(default)]
    pub mode: ArgMode,
}

impl ArgDoc {
    /// By-value argument
    #[must_use]
    pub fn value(expr: ExprDoc) -> Self {
        Self {
            expr,
            mode: ArgMode::Value,
        }
    }

    /// By-reference argument
    #[must_use]
    pub fn by_ref(expr: ExprDoc) -> Self {
        Self {
            expr,
            mode: ArgMode::Ref,
        }
    }

    /// Out-argument assigning the named local
    #[must_use]
    pub fn out(local: &str) -> Self {
        Self {
            expr: ExprDoc::name(local),
            mode: ArgMode::Out,
        }
    }
}

impl TypeDoc {
    /// Declares a type
    #[must_use]
    pub fn new(name: &str, dyn_sized: bool) -> Self {
        Self {
            name: name.to_string(),
            dyn_sized,
        }
    }
}

impl LocalDoc {
    /// Declares a local
    #[must_use]
    pub fn new(name: &str, ty: Option<&str>, kind: LocalKind) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.map(str::to_string),
            kind,
        }
    }
}

impl ParamDoc {
    /// Declares a parameter
    #[must_use]
    pub fn new(name: &str, ty: Option<&str>, by_ref: bool) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.map(str::to_string),
            by_ref,
        }
    }
}
