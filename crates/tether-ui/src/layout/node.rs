//! Expression nodes and the recompute/propagation protocol.
//!
//! A node owns its operands (`Rc`), knows its parents only through `Weak`
//! back-edges, and keeps weak slots for the [`Layout`](super::Layout)
//! handles wrapping it. Nothing here holds a `RefCell` borrow while a
//! callback runs: callbacks re-enter the graph freely.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::layout::operation::Operation;
use crate::layout::parser;
use crate::layout::resolve::{Subscriber, Trigger};
use crate::signal::Subscription;
use crate::widget::{LayoutWidget, WidgetRef};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an expression node, stable for its whole lifetime.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) type NodeRef = Rc<RefCell<ExpressionNode>>;
type WeakNode = Weak<RefCell<ExpressionNode>>;

// ── HandleSlot ────────────────────────────────────────────────────────────

/// Per-handle state shared between a `Layout` and the node it wraps.
#[derive(Default)]
pub(crate) struct HandleSlot {
    pub(crate) callback: RefCell<Option<Rc<dyn Fn()>>>,
}

// ── ExpressionNode ────────────────────────────────────────────────────────

struct ParentEdge {
    id: NodeId,
    node: WeakNode,
}

/// A widget signal this node is connected to.
struct WidgetSignal {
    widget: Weak<dyn LayoutWidget>,
    trigger: Trigger,
}

impl WidgetSignal {
    fn is(&self, widget: &WidgetRef, trigger: Trigger) -> bool {
        self.trigger == trigger
            && self.widget.as_ptr() as *const () == Rc::as_ptr(widget) as *const ()
    }
}

/// One operator, literal, or unparsed expression in a layout's operand tree.
pub struct ExpressionNode {
    id: NodeId,
    operation: Operation,
    value: f32,
    /// Raw text, only for [`Operation::StringExpr`].
    string_expression: String,
    operands: Vec<NodeRef>,
    parents: Vec<ParentEdge>,
    handles: Vec<Weak<HandleSlot>>,
    /// Widget signals already wired to this node.
    subscriptions: Vec<WidgetSignal>,
    /// Widget that string references are resolved against.
    context: Option<Weak<dyn LayoutWidget>>,
}

impl ExpressionNode {
    fn blank(operation: Operation) -> Self {
        Self {
            id: NodeId::next(),
            operation,
            value: 0.0,
            string_expression: String::new(),
            operands: Vec::new(),
            parents: Vec::new(),
            handles: Vec::new(),
            subscriptions: Vec::new(),
            context: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn string_expression(&self) -> Option<&str> {
        (self.operation == Operation::StringExpr).then_some(self.string_expression.as_str())
    }

    /// Live parent back-edges.
    pub fn parent_count(&self) -> usize {
        self.parents.iter().filter(|edge| edge.node.strong_count() > 0).count()
    }

    /// Live handles wrapping this node.
    pub fn handle_count(&self) -> usize {
        self.handles.iter().filter(|slot| slot.strong_count() > 0).count()
    }

    /// Widget signals wired to this node whose widget is still alive.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.iter().filter(|s| s.widget.strong_count() > 0).count()
    }
}

impl Drop for ExpressionNode {
    fn drop(&mut self) {
        let id = self.id;
        for operand in &self.operands {
            // A failed borrow leaves a dead edge behind; upgrades skip it.
            if let Ok(mut operand) = operand.try_borrow_mut() {
                operand.parents.retain(|edge| edge.id != id);
            }
        }
    }
}

// ── construction ──────────────────────────────────────────────────────────

pub(crate) fn literal(value: f32) -> NodeRef {
    let mut node = ExpressionNode::blank(Operation::Value);
    node.value = value;
    Rc::new(RefCell::new(node))
}

/// A string node, evaluated once right away without a context widget.
pub(crate) fn string(expression: &str) -> NodeRef {
    let mut node = ExpressionNode::blank(Operation::StringExpr);
    node.string_expression = expression.to_owned();
    let node = Rc::new(RefCell::new(node));
    recompute(&node);
    node
}

/// A new node applying `operation` to `operands`, computed once.
pub(crate) fn compose(operation: Operation, operands: Vec<NodeRef>) -> NodeRef {
    debug_assert_eq!(operands.len(), operation.arity());

    let mut node = ExpressionNode::blank(operation);
    node.operands = operands;
    let id = node.id;
    let node = Rc::new(RefCell::new(node));

    let operands = node.borrow().operands.clone();
    for operand in &operands {
        let mut operand = operand.borrow_mut();
        if !operand.parents.iter().any(|edge| edge.id == id) {
            operand.parents.push(ParentEdge { id, node: Rc::downgrade(&node) });
        }
    }

    recompute(&node);
    node
}

// ── handles ───────────────────────────────────────────────────────────────

pub(crate) fn attach(node: &NodeRef, slot: &Rc<HandleSlot>) {
    node.borrow_mut().handles.push(Rc::downgrade(slot));
}

pub(crate) fn detach(node: &NodeRef, slot: &Rc<HandleSlot>) {
    // A failed borrow leaves a dead slot; notify_handles prunes it.
    if let Ok(mut node) = node.try_borrow_mut() {
        let target = Rc::as_ptr(slot);
        node.handles.retain(|h| h.strong_count() > 0 && h.as_ptr() != target);
    }
}

/// Invoke the callback of every handle attached to `node`.
pub(crate) fn notify_handles(node: &NodeRef) {
    let callbacks: Vec<Rc<dyn Fn()>> = {
        let mut node = node.borrow_mut();
        node.handles.retain(|slot| slot.strong_count() > 0);
        node.handles
            .iter()
            .filter_map(Weak::upgrade)
            .filter_map(|slot| slot.callback.borrow().clone())
            .collect()
    };
    for callback in callbacks {
        callback();
    }
}

// ── recompute / propagation ───────────────────────────────────────────────

/// Recompute every operand, then this node, then notify its handles.
///
/// Every operand is recomputed, including the untaken branches of a
/// conditional.
pub(crate) fn recompute(node: &NodeRef) {
    let (operation, operands) = {
        let node = node.borrow();
        (node.operation, node.operands.clone())
    };

    for operand in &operands {
        recompute(operand);
    }

    let value = match operation {
        Operation::Value => node.borrow().value,
        Operation::StringExpr => evaluate_string(node),
        _ => {
            let values: Vec<f32> = operands.iter().map(|o| o.borrow().value).collect();
            operation.apply(&values)
        }
    };

    node.borrow_mut().value = value;
    notify_handles(node);
}

/// Walk parent edges up to every root and recompute from each root.
pub(crate) fn propagate_upward(node: &NodeRef) {
    let parents: Vec<NodeRef> = node
        .borrow()
        .parents
        .iter()
        .filter_map(|edge| edge.node.upgrade())
        .collect();

    if parents.is_empty() {
        recompute(node);
    } else {
        for parent in &parents {
            propagate_upward(parent);
        }
    }
}

/// Set a leaf's value and propagate it.
///
/// Handles on the leaf itself are notified once more after the roots have
/// been recomputed, so a leaf under some parent notifies its handles twice.
/// A leaf that is its own root is only notified by the recompute: a second
/// notification would repeat the first with the same value.
pub(crate) fn reset_leaf(node: &NodeRef, value: f32) {
    let is_root = {
        let mut node = node.borrow_mut();
        node.value = value;
        node.parents.iter().all(|edge| edge.node.strong_count() == 0)
    };

    propagate_upward(node);

    if !is_root {
        notify_handles(node);
    }
}

/// Record that `node` listens to `trigger` on `widget`.
///
/// Returns `false` if it already did, however the widget was named.
pub(crate) fn register_subscription(
    node: &NodeRef,
    widget: &WidgetRef,
    trigger: Trigger,
) -> bool {
    let mut node = node.borrow_mut();
    node.subscriptions.retain(|s| s.widget.strong_count() > 0);
    if node.subscriptions.iter().any(|s| s.is(widget, trigger)) {
        return false;
    }
    node.subscriptions.push(WidgetSignal { widget: Rc::downgrade(widget), trigger });
    true
}

/// Resolve string references in the tree under `node` against `widget`.
///
/// Signals already wired stay wired, so resolving again against an unchanged
/// widget tree subscribes to nothing new.
pub(crate) fn connect_widget(node: &NodeRef, widget: &WidgetRef) {
    set_context(node, &Rc::downgrade(widget));
    propagate_upward(node);
}

fn set_context(node: &NodeRef, context: &Weak<dyn LayoutWidget>) {
    let operands = {
        let mut node = node.borrow_mut();
        if node.operation == Operation::StringExpr {
            node.context = Some(context.clone());
        }
        node.operands.clone()
    };
    for operand in &operands {
        set_context(operand, context);
    }
}

fn evaluate_string(node: &NodeRef) -> f32 {
    let (expression, context) = {
        let node = node.borrow();
        (
            node.string_expression.clone(),
            node.context.as_ref().and_then(Weak::upgrade),
        )
    };
    let mut subscriber = NodeSubscriber { node };
    parser::evaluate(&expression, context.as_ref(), &mut subscriber)
}

// ── NodeSubscriber ────────────────────────────────────────────────────────

/// Wires widget signals to "propagate from this node", once per widget signal.
struct NodeSubscriber<'a> {
    node: &'a NodeRef,
}

impl Subscriber for NodeSubscriber<'_> {
    fn subscribe(&mut self, key: &str, widget: &WidgetRef, trigger: Trigger) {
        if !register_subscription(self.node, widget, trigger) {
            return;
        }
        log::trace!("layout node subscribed to {key}");

        let node = Rc::downgrade(self.node);
        trigger.connect(
            widget,
            Subscription::owned_by(self.node, move || {
                if let Some(node) = node.upgrade() {
                    propagate_upward(&node);
                }
            }),
        );
    }
}

// ── rendering ─────────────────────────────────────────────────────────────

/// Write the expression rooted at `node` back as layout text.
pub(crate) fn write_expression(node: &NodeRef, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let node = node.borrow();
    match node.operation {
        Operation::Value => write!(f, "{}", node.value),
        Operation::StringExpr => f.write_str(&node.string_expression),
        Operation::Minimum | Operation::Maximum => {
            let name = if node.operation == Operation::Minimum { "min" } else { "max" };
            write!(f, "{name}(")?;
            write_expression(&node.operands[0], f)?;
            f.write_str(", ")?;
            write_expression(&node.operands[1], f)?;
            f.write_str(")")
        }
        Operation::Conditional => {
            f.write_str("if ")?;
            write_operand(&node.operands[0], f)?;
            f.write_str(" then ")?;
            write_operand(&node.operands[1], f)?;
            f.write_str(" else ")?;
            write_operand(&node.operands[2], f)
        }
        operation => {
            write_operand(&node.operands[0], f)?;
            write!(f, " {} ", operation.symbol().unwrap_or("?"))?;
            write_operand(&node.operands[1], f)
        }
    }
}

fn write_operand(node: &NodeRef, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let bare = matches!(
        node.borrow().operation,
        Operation::Value | Operation::Minimum | Operation::Maximum
    );
    if bare {
        write_expression(node, f)
    } else {
        f.write_str("(")?;
        write_expression(node, f)?;
        f.write_str(")")
    }
}
