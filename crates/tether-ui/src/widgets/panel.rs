use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_engine::coords::Vec2;

use crate::layout::Layout2d;
use crate::signal::{Signal, Subscription};
use crate::widget::{LayoutWidget, WidgetRef};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Geometry {
    Position,
    Size,
}

struct PanelState {
    position: Vec2,
    size: Vec2,
    position_layout: Layout2d,
    size_layout: Layout2d,
    parent: Option<Weak<Panel>>,
    children: Vec<(String, Rc<Panel>)>,
}

impl PanelState {
    fn layout(&self, geometry: Geometry) -> &Layout2d {
        match geometry {
            Geometry::Position => &self.position_layout,
            Geometry::Size => &self.size_layout,
        }
    }

    fn layout_mut(&mut self, geometry: Geometry) -> &mut Layout2d {
        match geometry {
            Geometry::Position => &mut self.position_layout,
            Geometry::Size => &mut self.size_layout,
        }
    }

    fn value_mut(&mut self, geometry: Geometry) -> &mut Vec2 {
        match geometry {
            Geometry::Position => &mut self.position,
            Geometry::Size => &mut self.size,
        }
    }
}

/// A rectangular container whose position and size are layouts.
///
/// Panels form a tree of named children. Expression strings set on a panel
/// resolve names against that tree: `"b1.right"` reads the child or sibling
/// named `b1`, `"parent.size"` the container.
///
/// # Example
/// ```rust,ignore
/// let panel = Panel::new();
/// panel.set_size((200.0, 180.0));
///
/// let button = Panel::new();
/// button.set_size("{50%, 40}");
/// panel.add(button.clone(), "button");
/// assert_eq!(button.size(), Vec2::new(100.0, 40.0));
/// ```
pub struct Panel {
    this: Weak<Panel>,
    state: RefCell<PanelState>,
    pub(crate) position_changed: Signal,
    pub(crate) size_changed: Signal,
}

impl Panel {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| Panel {
            this: this.clone(),
            state: RefCell::new(PanelState {
                position: Vec2::zero(),
                size: Vec2::zero(),
                position_layout: Layout2d::default(),
                size_layout: Layout2d::default(),
                parent: None,
                children: Vec::new(),
            }),
            position_changed: Signal::new(),
            size_changed: Signal::new(),
        })
    }

    /// Set the position relative to the parent.
    ///
    /// Accepts anything convertible to a [`Layout2d`]: a `Vec2`, a tuple,
    /// a 2D expression string, or a composed layout.
    pub fn set_position(&self, layout: impl Into<Layout2d>) {
        self.install(Geometry::Position, layout.into());
    }

    pub fn set_size(&self, layout: impl Into<Layout2d>) {
        self.install(Geometry::Size, layout.into());
    }

    pub fn position(&self) -> Vec2 {
        self.state.borrow().position
    }

    pub fn size(&self) -> Vec2 {
        self.state.borrow().size
    }

    /// Position in the coordinates of the root container.
    pub fn absolute_position(&self) -> Vec2 {
        let mut position = self.position();
        let mut parent = self.parent_panel();
        while let Some(panel) = parent {
            position = position + panel.position();
            parent = panel.parent_panel();
        }
        position
    }

    pub fn position_layout(&self) -> Layout2d {
        self.state.borrow().position_layout.clone()
    }

    pub fn size_layout(&self) -> Layout2d {
        self.state.borrow().size_layout.clone()
    }

    pub fn parent_panel(&self) -> Option<Rc<Panel>> {
        self.state.borrow().parent.as_ref().and_then(Weak::upgrade)
    }

    /// Add `child` under `name`, taking it from its previous container.
    ///
    /// The child's layouts are resolved again against its new siblings.
    pub fn add(&self, child: Rc<Panel>, name: &str) {
        if let Some(previous) = child.parent_panel() {
            previous.remove(&child);
        }
        child.state.borrow_mut().parent = Some(self.this.clone());
        self.state.borrow_mut().children.push((name.to_owned(), child.clone()));
        log::trace!("panel {name:?} added");
        child.reconnect_layouts();
    }

    /// Detach `child`. Returns `false` if it was not a child of this panel.
    pub fn remove(&self, child: &Rc<Panel>) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            let before = state.children.len();
            state.children.retain(|(_, c)| !Rc::ptr_eq(c, child));
            before != state.children.len()
        };
        if removed {
            child.state.borrow_mut().parent = None;
            child.reconnect_layouts();
        }
        removed
    }

    /// The child named `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<Rc<Panel>> {
        self.state
            .borrow()
            .children
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, child)| child.clone())
    }

    pub fn children(&self) -> Vec<Rc<Panel>> {
        self.state.borrow().children.iter().map(|(_, c)| c.clone()).collect()
    }

    // ── Layout plumbing ───────────────────────────────────────────────────

    fn as_widget(&self) -> Option<WidgetRef> {
        self.this.upgrade().map(|panel| panel as WidgetRef)
    }

    fn install(&self, geometry: Geometry, layout: Layout2d) {
        if let Some(widget) = self.as_widget() {
            layout.connect_widget(&widget);
        }
        let this = self.this.clone();
        layout.connect_update_callback(move || {
            if let Some(panel) = this.upgrade() {
                panel.apply(geometry);
            }
        });

        let previous = {
            let mut state = self.state.borrow_mut();
            std::mem::replace(state.layout_mut(geometry), layout)
        };
        drop(previous);
        self.apply(geometry);
    }

    /// Copy the layout's value into the geometry, emitting on change.
    fn apply(&self, geometry: Geometry) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let value = state.layout(geometry).value();
            let current = state.value_mut(geometry);
            let changed = *current != value;
            *current = value;
            changed
        };
        if changed {
            match geometry {
                Geometry::Position => self.position_changed.emit(),
                Geometry::Size => self.size_changed.emit(),
            }
        }
    }

    fn reconnect_layouts(&self) {
        let Some(widget) = self.as_widget() else {
            return;
        };
        let (position, size) = {
            let state = self.state.borrow();
            (state.position_layout.clone(), state.size_layout.clone())
        };
        position.connect_widget(&widget);
        size.connect_widget(&widget);
    }
}

impl LayoutWidget for Panel {
    fn position(&self) -> Vec2 {
        Panel::position(self)
    }

    fn size(&self) -> Vec2 {
        Panel::size(self)
    }

    fn parent(&self) -> Option<WidgetRef> {
        self.parent_panel().map(|panel| panel as WidgetRef)
    }

    fn child(&self, name: &str) -> Option<WidgetRef> {
        self.get(name).map(|panel| panel as WidgetRef)
    }

    fn on_position_changed(&self, subscription: Subscription) {
        self.position_changed.subscribe(subscription);
    }

    fn on_size_changed(&self, subscription: Subscription) {
        self.size_changed.subscribe(subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{
        Layout, bind_bottom, bind_height, bind_if, bind_left, bind_position, bind_right, bind_size,
        bind_top, bind_width,
    };

    /// Panel at (10, 25) sized 200x180 holding b1 (40, 60, 300x50) and
    /// b2 (60, 75, 400x40).
    fn scene() -> (Rc<Panel>, Rc<Panel>, Rc<Panel>) {
        let panel = Panel::new();
        panel.set_position(Vec2::new(10.0, 25.0));
        panel.set_size(Vec2::new(200.0, 180.0));

        let b1 = Panel::new();
        b1.set_position(Vec2::new(40.0, 60.0));
        b1.set_size(Vec2::new(300.0, 50.0));
        panel.add(b1.clone(), "b1");

        let b2 = Panel::new();
        b2.set_position(Vec2::new(60.0, 75.0));
        b2.set_size(Vec2::new(400.0, 40.0));
        panel.add(b2.clone(), "b2");

        (panel, b1, b2)
    }

    #[test]
    fn plain_geometry() {
        let p = Panel::new();
        p.set_position((3.0_f32, 4.0_f32));
        p.set_size(Vec2::new(5.0, 6.0));
        assert_eq!(p.position(), Vec2::new(3.0, 4.0));
        assert_eq!(p.size(), Vec2::new(5.0, 6.0));
    }

    #[test]
    fn string_references_to_siblings() {
        let (panel, _b1, _b2) = scene();
        let w = Panel::new();
        panel.add(w.clone(), "w");

        w.set_position("b1.right");
        assert_eq!(w.position(), Vec2::new(340.0, 340.0));
        w.set_position("{b1.right, b1.bottom}");
        assert_eq!(w.position(), Vec2::new(340.0, 110.0));
        w.set_position("{parent.x, &.y}");
        assert_eq!(w.position(), Vec2::new(10.0, 25.0));
        w.set_position("{parent.b1.parent.b1.x, &.b1.&.b1.y}");
        assert_eq!(w.position(), Vec2::new(40.0, 60.0));
    }

    #[test]
    fn references_resolve_once_added() {
        let (panel, b1, _b2) = scene();
        let w = Panel::new();
        w.set_position("b1.position");
        assert_eq!(w.position(), Vec2::zero());

        panel.add(w.clone(), "w");
        assert_eq!(w.position(), Vec2::new(40.0, 60.0));

        b1.set_position(Vec2::new(60.0, 75.0));
        assert_eq!(w.position(), Vec2::new(60.0, 75.0));
    }

    #[test]
    fn string_expressions_track_changes() {
        let (panel, b1, b2) = scene();
        let w = Panel::new();
        panel.add(w.clone(), "w3");

        w.set_size("2.5 * b1.pos + b2.size / 4 + {100, 50}");
        assert_eq!(w.size(), Vec2::new(300.0, 210.0));

        b1.set_position(Vec2::new(0.0, 0.0));
        assert_eq!(w.size(), Vec2::new(200.0, 60.0));
        b2.set_size(Vec2::new(0.0, 0.0));
        assert_eq!(w.size(), Vec2::new(100.0, 50.0));
    }

    #[test]
    fn string_conditionals() {
        let (panel, b1, _b2) = scene();
        let w = Panel::new();
        panel.add(w.clone(), "w3");

        w.set_size("(if b1.w > b2.h then 2 * b1.w else b2.w / 4) * 3");
        assert_eq!(w.size(), Vec2::new(1800.0, 1800.0));

        b1.set_size(Vec2::new(30.0, 10.0));
        assert_eq!(w.size(), Vec2::new(300.0, 300.0));

        w.set_position("b1.x != b2.y ? b1.pos : 1.5 * b2.position");
        assert_eq!(w.position(), Vec2::new(40.0, 60.0));
        b1.set_position(Vec2::new(75.0, 60.0));
        assert_eq!(w.position(), Vec2::new(90.0, 112.5));
    }

    #[test]
    fn composed_layouts() {
        let (panel, b1, b2) = scene();
        let w = Panel::new();
        panel.add(w.clone(), "w3");

        w.set_size(2.5 * bind_position(&b1) + bind_size(&b2) / 4.0 + Vec2::new(100.0, 50.0));
        assert_eq!(w.size(), Vec2::new(300.0, 210.0));

        w.set_position(Layout2d::new(
            2.0 * bind_right(&b1) + bind_left(&b2) / 4.0 + bind_width(&b1),
            50.0 + bind_bottom(&b2) % 75.0 * bind_top(&b2),
        ));
        assert_eq!(w.position(), Vec2::new(995.0, 3050.0));
        assert_eq!(w.absolute_position(), Vec2::new(1005.0, 3075.0));
    }

    #[test]
    fn composed_conditionals() {
        let (panel, b1, b2) = scene();
        let w = Panel::new();
        panel.add(w.clone(), "w3");

        let width = bind_if(
            bind_width(&b1).greater_than(bind_height(&b2)),
            2.0 * bind_width(&b1),
            bind_width(&b2) / 4.0,
        ) * 3.0;
        w.set_size(Layout2d::new(width, 0.0));
        assert_eq!(w.size().x, 1800.0);

        b1.set_size(Vec2::new(30.0, 10.0));
        assert_eq!(w.size().x, 300.0);
    }

    #[test]
    fn size_follows_the_parent() {
        let parent = Panel::new();
        parent.set_size(Vec2::new(10.0, 10.0));
        let child = Panel::new();
        parent.add(child.clone(), "child");

        child.set_size("{&.w - 20, &.h}");
        assert_eq!(child.size(), Vec2::new(-10.0, 10.0));

        parent.set_size(Vec2::new(200.0, 100.0));
        assert_eq!(child.size(), Vec2::new(180.0, 100.0));
    }

    #[test]
    fn percentages() {
        let parent = Panel::new();
        parent.set_size(Vec2::new(400.0, 300.0));
        let child = Panel::new();
        parent.add(child.clone(), "child");

        child.set_size("{50%, 10% + 5}");
        assert_eq!(child.size(), Vec2::new(200.0, 35.0));
        parent.set_size(Vec2::new(100.0, 100.0));
        assert_eq!(child.size(), Vec2::new(50.0, 15.0));
    }

    #[test]
    fn signals_fire_only_on_change() {
        use std::cell::Cell;

        let p = Panel::new();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            p.on_size_changed(Subscription::new(move || hits.set(hits.get() + 1)));
        }
        p.set_size(Vec2::new(1.0, 1.0));
        p.set_size(Vec2::new(1.0, 1.0));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn repeated_adds_do_not_duplicate_subscriptions() {
        let (panel, b1, _b2) = scene();
        let w = Panel::new();
        w.set_size("b1.size + b1.w * 0");
        w.set_position("{width, parent.x + &.x}");
        panel.add(w.clone(), "w");
        let size = w.size_layout();
        assert_eq!(size.x.inspect(|n| n.subscription_count()), 1);
        assert_eq!(b1.size_changed.len(), 2);
        assert_eq!(w.size_changed.len(), 1);
        assert_eq!(panel.position_changed.len(), 1);

        for _ in 0..5 {
            panel.add(w.clone(), "w");
        }
        assert_eq!(size.x.inspect(|n| n.subscription_count()), 1);
        assert_eq!(b1.size_changed.len(), 2);
        assert_eq!(w.size_changed.len(), 1);
        assert_eq!(panel.position_changed.len(), 1);

        b1.set_size(Vec2::new(7.0, 8.0));
        assert_eq!(w.size(), Vec2::new(7.0, 8.0));
        assert_eq!(w.position(), Vec2::new(7.0, 20.0));
    }

    #[test]
    fn replaced_string_layouts_release_their_signals() {
        let (panel, b1, _b2) = scene();
        let w = Panel::new();
        panel.add(w.clone(), "w");

        for i in 0..100 {
            w.set_size(format!("b1.size + {i}"));
        }
        assert_eq!(b1.size_changed.len(), 2);
        assert_eq!(w.size(), Vec2::new(399.0, 149.0));

        w.set_size(Vec2::new(1.0, 1.0));
        assert!(b1.size_changed.is_empty());
    }

    #[test]
    fn replaced_layouts_stop_driving_the_panel() {
        let (panel, b1, _b2) = scene();
        let w = Panel::new();
        panel.add(w.clone(), "w");

        w.set_size(bind_size(&b1));
        w.set_size(Vec2::new(1.0, 2.0));
        b1.set_size(Vec2::new(90.0, 90.0));
        assert_eq!(w.size(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn children_move_between_containers() {
        let (panel, _b1, _b2) = scene();
        let other = Panel::new();
        let w = Panel::new();
        panel.add(w.clone(), "w");
        w.set_size("{parent.w, 1}");
        assert_eq!(w.size().x, 200.0);

        other.set_size(Vec2::new(50.0, 50.0));
        other.add(w.clone(), "w");
        assert!(panel.get("w").is_none());
        assert!(other.get("W").is_some_and(|found| Rc::ptr_eq(&found, &w)));
        assert_eq!(w.size().x, 50.0);

        assert!(other.remove(&w));
        assert!(!other.remove(&w));
        assert_eq!(w.size().x, 0.0);
    }

    #[test]
    fn layouts_survive_their_handles() {
        let (panel, b1, _b2) = scene();
        let w = Panel::new();
        panel.add(w.clone(), "w");
        {
            let doubled: Layout = bind_width(&b1) * 2.0;
            w.set_size(Layout2d::new(doubled, 1.0));
        }
        b1.set_size(Vec2::new(10.0, 1.0));
        assert_eq!(w.size().x, 20.0);
    }
}
