//! Lowering of [`ProgramDoc`] trees into arena form.
//!
//! Names are resolved against the declarations of the document and every
//! node receives a span from a single pre-order counter: a node's start is
//! taken before its children are lowered and its end after, so span order is
//! exactly source order and every parent encloses its children.

use rustc_hash::FxHashMap;
use rp_intern::Symbol;
use rp_span::{FileId, FileSpan, Span};

use crate::surface::{ArgDoc, ExprDoc, MethodDoc, ProgramDoc, StmtDoc};
use crate::{
    Arg, ArgMode, Body, Expr, ExprId, LocalDecl, LocalId, MethodDef, MethodId, ParamDecl,
    ParamId, ProgramDb, Stmt, StmtId, TypeDef, TypeId,
};

/// Errors produced while lowering a program document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    /// A type name that was never declared
    #[error("unknown type `{name}`")]
    UnknownType {
        /// The missing type
        name: String,
    },

    /// A variable name not declared as a local or parameter of the method
    #[error("unknown variable `{name}` in method `{method}`")]
    UnknownName {
        /// The missing variable
        name: String,
        /// Method being lowered
        method: String,
    },

    /// A call to a method that was never declared
    #[error("unknown method `{name}`")]
    UnknownMethod {
        /// The missing method
        name: String,
    },

    /// A type declared twice
    #[error("type `{name}` is declared more than once")]
    DuplicateType {
        /// The duplicated type
        name: String,
    },

    /// A method signature declared twice
    #[error("method `{signature}` is declared more than once")]
    DuplicateMethod {
        /// The duplicated signature
        signature: String,
    },

    /// A local or parameter name declared twice in one method
    #[error("variable `{name}` is declared more than once in method `{method}`")]
    DuplicateName {
        /// The duplicated variable
        name: String,
        /// Method being lowered
        method: String,
    },

    /// An out-argument that does not name a local
    #[error("out-argument in method `{method}` must name a local variable")]
    OutArgNotLocal {
        /// Method being lowered
        method: String,
    },

    /// A `let`, rebind or loop binding naming something that is not a local
    #[error("`{name}` in method `{method}` is not a local variable")]
    NotALocal {
        /// The offending name
        name: String,
        /// Method being lowered
        method: String,
    },
}

/// Result type for lowering.
pub type LowerResult<T> = Result<T, LowerError>;

/// Lowers a program document.
///
/// # Errors
///
/// Returns the first [`LowerError`] encountered; nothing is lowered partially.
pub fn lower_program(doc: &ProgramDoc) -> LowerResult<ProgramDb> {
    let mut program = ProgramDb::new(FileId(doc.file));
    let mut types: FxHashMap<String, TypeId> = FxHashMap::default();

    for ty in &doc.types {
        if types.contains_key(&ty.name) || ty.name == crate::UNKNOWN_TYPE_NAME {
            return Err(LowerError::DuplicateType {
                name: ty.name.clone(),
            });
        }
        let id = program.types.alloc(TypeDef {
            name: program.interner.intern(&ty.name),
            dyn_sized: ty.dyn_sized,
        });
        types.insert(ty.name.clone(), id);
    }

    let mut signatures: FxHashMap<String, MethodId> = FxHashMap::default();
    let mut names: FxHashMap<String, Vec<MethodId>> = FxHashMap::default();
    let mut pending: Vec<(MethodId, &MethodDoc)> = Vec::new();

    for method in &doc.methods {
        let signature = method
            .signature
            .clone()
            .unwrap_or_else(|| method.name.clone());
        if signatures.contains_key(&signature) {
            return Err(LowerError::DuplicateMethod { signature });
        }

        let params = method
            .params
            .iter()
            .map(|param| program.interner.intern(&param.name))
            .collect();
        let id = program.methods.alloc(MethodDef {
            name: program.interner.intern(&method.name),
            signature: signature.clone(),
            params,
            kind: method.kind,
            declared_path: method.path.clone(),
            returns_ref: method.returns_ref,
            body: None,
            span: FileSpan::dummy(),
        });
        signatures.insert(signature, id);
        names.entry(method.name.clone()).or_default().push(id);
        if method.body.is_some() {
            pending.push((id, method));
        }
    }

    let mut cursor = 0_u32;
    for (id, method) in pending {
        let mut lowerer = BodyLowerer {
            program: &program,
            types: &types,
            signatures: &signatures,
            names: &names,
            method: &method.name,
            body: Body::new(id),
            vars: FxHashMap::default(),
            cursor,
        };
        let body = lowerer.lower_method(method)?;
        cursor = lowerer.cursor;

        let def = &mut program.methods[id];
        def.span = body.span;
        def.body = Some(body);
    }

    Ok(program)
}

#[derive(Clone, Copy)]
enum Var {
    Local(LocalId),
    Param(ParamId),
}

struct BodyLowerer<'a> {
    program: &'a ProgramDb,
    types: &'a FxHashMap<String, TypeId>,
    signatures: &'a FxHashMap<String, MethodId>,
    names: &'a FxHashMap<String, Vec<MethodId>>,
    method: &'a str,
    body: Body,
    vars: FxHashMap<String, Var>,
    cursor: u32,
}

impl BodyLowerer<'_> {
    fn tick(&mut self) -> u32 {
        let pos = self.cursor;
        self.cursor += 1;
        pos
    }

    fn span_from(&mut self, start: u32) -> FileSpan {
        let end = self.tick();
        FileSpan::new(self.program.file, Span::new(start, end + 1))
    }

    fn intern(&self, text: &str) -> Symbol {
        self.program.interner.intern(text)
    }

    fn ty(&self, name: Option<&String>) -> LowerResult<TypeId> {
        match name {
            None => Ok(self.program.unknown_ty()),
            Some(name) => self
                .types
                .get(name)
                .copied()
                .ok_or_else(|| LowerError::UnknownType { name: name.clone() }),
        }
    }

    fn method_id(&self, name: &str) -> LowerResult<MethodId> {
        if let Some(id) = self.signatures.get(name) {
            return Ok(*id);
        }
        match self.names.get(name).map(Vec::as_slice) {
            Some([id]) => Ok(*id),
            _ => Err(LowerError::UnknownMethod {
                name: name.to_string(),
            }),
        }
    }

    fn declare(&mut self, name: &str, var: Var) -> LowerResult<()> {
        if self.vars.insert(name.to_string(), var).is_some() {
            return Err(LowerError::DuplicateName {
                name: name.to_string(),
                method: self.method.to_string(),
            });
        }
        Ok(())
    }

    fn var(&self, name: &str) -> LowerResult<Var> {
        self.vars
            .get(name)
            .copied()
            .ok_or_else(|| LowerError::UnknownName {
                name: name.to_string(),
                method: self.method.to_string(),
            })
    }

    fn local(&self, name: &str) -> LowerResult<LocalId> {
        match self.var(name)? {
            Var::Local(local) => Ok(local),
            Var::Param(_) => Err(LowerError::NotALocal {
                name: name.to_string(),
                method: self.method.to_string(),
            }),
        }
    }

    fn lower_method(&mut self, method: &MethodDoc) -> LowerResult<Body> {
        let start = self.tick();

        for param in &method.params {
            let pos = self.tick();
            let decl = ParamDecl {
                name: self.intern(&param.name),
                ty: self.ty(param.ty.as_ref())?,
                by_ref: param.by_ref,
                span: FileSpan::new(self.program.file, Span::new(pos, pos + 1)),
            };
            let id = self.body.params.alloc(decl);
            self.declare(&param.name, Var::Param(id))?;
        }

        for local in &method.locals {
            let pos = self.tick();
            let decl = LocalDecl {
                name: self.intern(&local.name),
                ty: self.ty(local.ty.as_ref())?,
                kind: local.kind,
                span: FileSpan::new(self.program.file, Span::new(pos, pos + 1)),
            };
            let id = self.body.locals.alloc(decl);
            self.declare(&local.name, Var::Local(id))?;
        }

        let stmts = method.body.as_deref().unwrap_or_default();
        let root = self.lower_block(stmts)?;
        self.body.root = root;
        self.body.span = self.span_from(start);

        let method = self.body.method;
        Ok(std::mem::replace(&mut self.body, Body::new(method)))
    }

    fn lower_block(&mut self, stmts: &[StmtDoc]) -> LowerResult<StmtId> {
        let start = self.tick();
        let mut lowered = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            lowered.push(self.lower_stmt(stmt)?);
        }
        let span = self.span_from(start);
        Ok(self.body.stmts.alloc(Stmt::Block {
            stmts: lowered,
            span,
        }))
    }

    fn lower_stmt(&mut self, stmt: &StmtDoc) -> LowerResult<StmtId> {
        let start = self.tick();
        let lowered = match stmt {
            StmtDoc::Let { local, init } => {
                let local = self.local(local)?;
                let init = init.as_ref().map(|init| self.lower_expr(init)).transpose()?;
                Stmt::Let {
                    local,
                    init,
                    span: self.span_from(start),
                }
            }
            StmtDoc::RefAssign { local, value } => {
                let local = self.local(local)?;
                let value = self.lower_expr(value)?;
                Stmt::RefAssign {
                    local,
                    value,
                    span: self.span_from(start),
                }
            }
            StmtDoc::Assign { target, value } => {
                let target = self.lower_expr(target)?;
                let value = self.lower_expr(value)?;
                Stmt::Assign {
                    target,
                    value,
                    span: self.span_from(start),
                }
            }
            StmtDoc::Expr { expr } => {
                let expr = self.lower_expr(expr)?;
                Stmt::Expr {
                    expr,
                    span: self.span_from(start),
                }
            }
            StmtDoc::Return { value } => {
                let value = value.as_ref().map(|value| self.lower_expr(value)).transpose()?;
                Stmt::Return {
                    value,
                    span: self.span_from(start),
                }
            }
            StmtDoc::Block { stmts } => {
                let mut lowered = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    lowered.push(self.lower_stmt(stmt)?);
                }
                Stmt::Block {
                    stmts: lowered,
                    span: self.span_from(start),
                }
            }
            StmtDoc::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.lower_expr(cond)?;
                let then_branch = self.lower_block(then)?;
                let else_branch = otherwise
                    .as_deref()
                    .map(|stmts| self.lower_block(stmts))
                    .transpose()?;
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                    span: self.span_from(start),
                }
            }
            StmtDoc::While { cond, body } => {
                let cond = self.lower_expr(cond)?;
                let body = self.lower_block(body)?;
                Stmt::While {
                    cond,
                    body,
                    span: self.span_from(start),
                }
            }
            StmtDoc::ForEach {
                item,
                collection,
                body,
            } => {
                let item = self.local(item)?;
                let collection = self.lower_expr(collection)?;
                let body = self.lower_block(body)?;
                Stmt::ForEach {
                    item,
                    collection,
                    body,
                    span: self.span_from(start),
                }
            }
        };
        Ok(self.body.stmts.alloc(lowered))
    }

    fn lower_exprs(&mut self, exprs: &[ExprDoc]) -> LowerResult<Vec<ExprId>> {
        exprs.iter().map(|expr| self.lower_expr(expr)).collect()
    }

    fn lower_expr(&mut self, expr: &ExprDoc) -> LowerResult<ExprId> {
        let start = self.tick();
        let lowered = match expr {
            ExprDoc::Literal => Expr::Literal {
                span: self.span_from(start),
            },
            ExprDoc::Name { name } => match self.var(name)? {
                Var::Local(local) => Expr::Local {
                    local,
                    span: self.span_from(start),
                },
                Var::Param(param) => Expr::Param {
                    param,
                    span: self.span_from(start),
                },
            },
            ExprDoc::Field { receiver, name, ty } => {
                let receiver = receiver
                    .as_deref()
                    .map(|receiver| self.lower_expr(receiver))
                    .transpose()?;
                Expr::Field {
                    receiver,
                    name: self.intern(name),
                    ty: self.ty(ty.as_ref())?,
                    span: self.span_from(start),
                }
            }
            ExprDoc::Index {
                receiver,
                index,
                ty,
            } => {
                let receiver = self.lower_expr(receiver)?;
                let index = self.lower_exprs(index)?;
                Expr::Index {
                    receiver,
                    index,
                    ty: self.ty(ty.as_ref())?,
                    span: self.span_from(start),
                }
            }
            ExprDoc::Slice {
                receiver,
                range,
                ty,
            } => {
                let receiver = self.lower_expr(receiver)?;
                let range = self.lower_exprs(range)?;
                Expr::Slice {
                    receiver,
                    range,
                    ty: self.ty(ty.as_ref())?,
                    span: self.span_from(start),
                }
            }
            ExprDoc::ScopeValue { scope, ty } => {
                let scope = self.lower_expr(scope)?;
                Expr::ScopeValue {
                    scope,
                    ty: self.ty(ty.as_ref())?,
                    span: self.span_from(start),
                }
            }
            ExprDoc::Call { method, args, ty } => {
                let method = self.method_id(method)?;
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower_arg(arg)?);
                }
                Expr::Call {
                    method,
                    args: lowered,
                    ty: self.ty(ty.as_ref())?,
                    span: self.span_from(start),
                }
            }
            ExprDoc::Opaque { operands, ty } => {
                let operands = self.lower_exprs(operands)?;
                Expr::Opaque {
                    operands,
                    ty: self.ty(ty.as_ref())?,
                    span: self.span_from(start),
                }
            }
        };
        Ok(self.body.exprs.alloc(lowered))
    }

    fn lower_arg(&mut self, arg: &ArgDoc) -> LowerResult<Arg> {
        let expr = self.lower_expr(&arg.expr)?;
        if arg.mode == ArgMode::Out && self.body.as_local(expr).is_none() {
            return Err(LowerError::OutArgNotLocal {
                method: self.method.to_string(),
            });
        }
        Ok(Arg {
            expr,
            mode: arg.mode,
        })
    }
}
