//! Binding events and the position-indexed binding table.

use rp_hir::visitor::{BodyVisitor, walk_body, walk_expr, walk_stmt};
use rp_hir::{ArgMode, Body, Expr, ExprId, LocalId, Stmt, StmtId};
use rp_span::FileSpan;
use rustc_hash::FxHashMap;

/// How a local came to refer to its current location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Declaration with an initializer, or a by-reference reassignment
    Ordinary,
    /// Per-iteration binding of a loop over the producer collection
    LoopItem {
        /// The loop body the item is valid for
        body: FileSpan,
    },
    /// Assigned through an out-argument of a call. The producer is the
    /// argument itself and cannot be decomposed any further.
    OpaqueExternal,
}

/// One binding of a local to the location produced by an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceVariableBinding {
    /// The bound local
    pub local: LocalId,
    /// Expression producing the referenced location
    pub producer: ExprId,
    /// Binding kind
    pub kind: BindingKind,
    /// The node performing the binding
    pub span: FileSpan,
    /// Offset from which the binding is in effect. Uses starting at or after
    /// this offset see the binding.
    pub position: u32,
}

impl ReferenceVariableBinding {
    /// Returns `true` for loop-iteration bindings.
    #[must_use]
    pub fn is_loop_item(&self) -> bool {
        matches!(self.kind, BindingKind::LoopItem { .. })
    }
}

/// An entry of the source-ordered event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingEvent {
    /// A local was (re)bound
    Bind(ReferenceVariableBinding),
    /// A local was read
    Use {
        /// The local
        local: LocalId,
        /// The reading expression
        expr: ExprId,
        /// Start offset of the reading expression
        at: u32,
    },
}

impl BindingEvent {
    /// The local the event is about.
    #[must_use]
    pub fn local(&self) -> LocalId {
        match self {
            Self::Bind(binding) => binding.local,
            Self::Use { local, .. } => *local,
        }
    }

    /// Source offset of the event.
    #[must_use]
    pub fn position(&self) -> u32 {
        match self {
            Self::Bind(binding) => binding.position,
            Self::Use { at, .. } => *at,
        }
    }
}

/// Binding events of one body, in source order.
#[derive(Debug, Clone, Default)]
pub struct BindingIndex {
    events: Vec<BindingEvent>,
    binds_by_local: FxHashMap<LocalId, Vec<usize>>,
}

impl BindingIndex {
    /// Walks `body` once and records its binding events.
    #[must_use]
    pub fn build(body: &Body) -> Self {
        let mut collector = EventCollector { events: Vec::new() };
        walk_body(&mut collector, body);

        let mut binds_by_local: FxHashMap<LocalId, Vec<usize>> = FxHashMap::default();
        for (idx, event) in collector.events.iter().enumerate() {
            if let BindingEvent::Bind(binding) = event {
                binds_by_local.entry(binding.local).or_default().push(idx);
            }
        }

        tracing::trace!(
            events = collector.events.len(),
            locals = binds_by_local.len(),
            "built binding index"
        );

        Self {
            events: collector.events,
            binds_by_local,
        }
    }

    /// All events in source order.
    #[must_use]
    pub fn events(&self) -> &[BindingEvent] {
        &self.events
    }

    /// Bindings of `local`, in source order.
    pub fn bindings_of(
        &self,
        local: LocalId,
    ) -> impl DoubleEndedIterator<Item = &ReferenceVariableBinding> + '_ {
        self.binds_by_local
            .get(&local)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|idx| match &self.events[*idx] {
                BindingEvent::Bind(binding) => Some(binding),
                BindingEvent::Use { .. } => None,
            })
    }

    /// Expressions reading `local`, in source order.
    pub fn uses_of(&self, local: LocalId) -> impl Iterator<Item = ExprId> + '_ {
        self.events.iter().filter_map(move |event| match event {
            BindingEvent::Use { local: used, expr, .. } if *used == local => Some(*expr),
            _ => None,
        })
    }
}

struct EventCollector {
    events: Vec<BindingEvent>,
}

impl EventCollector {
    fn bind(
        &mut self,
        local: LocalId,
        producer: ExprId,
        kind: BindingKind,
        span: FileSpan,
        position: u32,
    ) {
        self.events.push(BindingEvent::Bind(ReferenceVariableBinding {
            local,
            producer,
            kind,
            span,
            position,
        }));
    }
}

impl BodyVisitor for EventCollector {
    fn visit_stmt(&mut self, body: &Body, stmt: StmtId) {
        match &body.stmts[stmt] {
            Stmt::Let {
                local,
                init: Some(init),
                span,
            } => {
                self.visit_expr(body, *init);
                self.bind(*local, *init, BindingKind::Ordinary, *span, span.end());
            }
            Stmt::RefAssign { local, value, span } => {
                self.visit_expr(body, *value);
                self.bind(*local, *value, BindingKind::Ordinary, *span, span.end());
            }
            Stmt::ForEach {
                item,
                collection,
                body: loop_body,
                span,
            } => {
                self.visit_expr(body, *collection);
                let kind = BindingKind::LoopItem {
                    body: body.stmts[*loop_body].span(),
                };
                let position = body.exprs[*collection].span().end();
                self.bind(*item, *collection, kind, *span, position);
                self.visit_stmt(body, *loop_body);
            }
            _ => walk_stmt(self, body, stmt),
        }
    }

    fn visit_expr(&mut self, body: &Body, expr: ExprId) {
        match &body.exprs[expr] {
            Expr::Local { local, span } => self.events.push(BindingEvent::Use {
                local: *local,
                expr,
                at: span.start(),
            }),
            Expr::Call { args, .. } => {
                for arg in args {
                    match (arg.mode, body.as_local(arg.expr)) {
                        (ArgMode::Out, Some(local)) => {
                            let span = body.exprs[arg.expr].span();
                            self.bind(local, arg.expr, BindingKind::OpaqueExternal, span, span.end());
                        }
                        _ => self.visit_expr(body, arg.expr),
                    }
                }
            }
            _ => walk_expr(self, body, expr),
        }
    }
}
