//! Tether UI — constraint layouts for a retained widget tree.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use tether_ui::prelude::*;
//!
//! let gui = Gui::new(Vec2::new(800.0, 600.0));
//!
//! let sidebar = Panel::new();
//! sidebar.set_size("{200, parent.height}");
//! gui.add(sidebar.clone(), "sidebar");
//!
//! let content = Panel::new();
//! content.set_position("{sidebar.right, 0}");
//! content.set_size(bind_size(&gui) - Layout2d::new(bind_width(&sidebar), 0.0));
//! gui.add(content.clone(), "content");
//!
//! gui.set_view_size(Vec2::new(1024.0, 768.0));
//! assert_eq!(content.size(), Vec2::new(824.0, 768.0));
//! ```
//!
//! # Bringing your own widgets
//!
//! Implement [`LayoutWidget`](widget::LayoutWidget) for any retained widget
//! type and layouts can read it, name it, and follow it.

pub mod layout;
pub mod signal;
pub mod widget;
pub mod widgets;

pub use widgets::{Gui, Panel};

/// Everything needed to build layouts, in one import.
pub mod prelude {
    pub use crate::layout::{
        Axis, BindTarget, ExpressionError, Layout, Layout2d, Operation, bind_bottom, bind_height,
        bind_if, bind_if_2d, bind_left, bind_max, bind_min, bind_position, bind_range, bind_right,
        bind_size, bind_str, bind_str_2d, bind_top, bind_width, parse, try_parse,
    };
    pub use crate::signal::{Signal, Subscription};
    pub use crate::widget::{LayoutWidget, WidgetRef};
    pub use crate::widgets::{Gui, Panel};

    pub use tether_engine::coords::Vec2;
}
