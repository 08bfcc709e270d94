//! Source-order traversal of method bodies.
//!
//! Implementors override [`BodyVisitor::visit_stmt`] / [`BodyVisitor::visit_expr`]
//! and call back into [`walk_stmt`] / [`walk_expr`] to keep recursing. The walk
//! visits children in the order they appear in the source, which is the order
//! the position-based analyses depend on.

use crate::{Body, Expr, ExprId, Stmt, StmtId};

/// Visitor over statements and expressions of a [`Body`].
pub trait BodyVisitor {
    /// Visit a statement
    fn visit_stmt(&mut self, body: &Body, stmt: StmtId) {
        walk_stmt(self, body, stmt);
    }

    /// Visit an expression
    fn visit_expr(&mut self, body: &Body, expr: ExprId) {
        walk_expr(self, body, expr);
    }
}

/// Visits the whole body starting from its root statement.
pub fn walk_body<V: BodyVisitor + ?Sized>(visitor: &mut V, body: &Body) {
    visitor.visit_stmt(body, body.root);
}

/// Visits the children of a statement in source order.
pub fn walk_stmt<V: BodyVisitor + ?Sized>(visitor: &mut V, body: &Body, stmt: StmtId) {
    match &body.stmts[stmt] {
        Stmt::Let { init, .. } => {
            if let Some(init) = init {
                visitor.visit_expr(body, *init);
            }
        }
        Stmt::RefAssign { value, .. } => visitor.visit_expr(body, *value),
        Stmt::Assign { target, value, .. } => {
            visitor.visit_expr(body, *target);
            visitor.visit_expr(body, *value);
        }
        Stmt::Expr { expr, .. } => visitor.visit_expr(body, *expr),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                visitor.visit_expr(body, *value);
            }
        }
        Stmt::Block { stmts, .. } => {
            for child in stmts {
                visitor.visit_stmt(body, *child);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            visitor.visit_expr(body, *cond);
            visitor.visit_stmt(body, *then_branch);
            if let Some(else_branch) = else_branch {
                visitor.visit_stmt(body, *else_branch);
            }
        }
        Stmt::While { cond, body: loop_body, .. } => {
            visitor.visit_expr(body, *cond);
            visitor.visit_stmt(body, *loop_body);
        }
        Stmt::ForEach {
            collection,
            body: loop_body,
            ..
        } => {
            visitor.visit_expr(body, *collection);
            visitor.visit_stmt(body, *loop_body);
        }
    }
}

/// Visits the children of an expression in source order.
pub fn walk_expr<V: BodyVisitor + ?Sized>(visitor: &mut V, body: &Body, expr: ExprId) {
    match &body.exprs[expr] {
        Expr::Literal { .. } | Expr::Local { .. } | Expr::Param { .. } => {}
        Expr::Field { receiver, .. } => {
            if let Some(receiver) = receiver {
                visitor.visit_expr(body, *receiver);
            }
        }
        Expr::Index {
            receiver, index, ..
        } => {
            visitor.visit_expr(body, *receiver);
            for operand in index {
                visitor.visit_expr(body, *operand);
            }
        }
        Expr::Slice {
            receiver, range, ..
        } => {
            visitor.visit_expr(body, *receiver);
            for operand in range {
                visitor.visit_expr(body, *operand);
            }
        }
        Expr::ScopeValue { scope, .. } => visitor.visit_expr(body, *scope),
        Expr::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(body, arg.expr);
            }
        }
        Expr::Opaque { operands, .. } => {
            for operand in operands {
                visitor.visit_expr(body, *operand);
            }
        }
    }
}
