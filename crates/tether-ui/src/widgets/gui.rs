use std::rc::Rc;

use tether_engine::coords::Vec2;

use crate::widgets::Panel;

/// Top of a widget tree: a root container sized to the view.
///
/// The root always sits at `(0, 0)`. Resizing the view resizes the root,
/// which recomputes every layout reading it.
pub struct Gui {
    root: Rc<Panel>,
}

impl Gui {
    pub fn new(view_size: Vec2) -> Self {
        let root = Panel::new();
        root.set_size(view_size);
        Self { root }
    }

    pub fn set_view_size(&self, size: Vec2) {
        log::debug!("view resized to {}x{}", size.x, size.y);
        self.root.set_size(size);
    }

    pub fn view_size(&self) -> Vec2 {
        self.root.size()
    }

    /// Add a top-level widget under `name`.
    pub fn add(&self, widget: Rc<Panel>, name: &str) {
        self.root.add(widget, name);
    }

    pub fn remove(&self, widget: &Rc<Panel>) -> bool {
        self.root.remove(widget)
    }

    pub fn get(&self, name: &str) -> Option<Rc<Panel>> {
        self.root.get(name)
    }

    /// The root container.
    pub fn container(&self) -> &Rc<Panel> {
        &self.root
    }
}
