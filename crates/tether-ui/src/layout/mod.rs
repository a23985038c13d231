//! Constraint layouts: widget geometry written as expressions over other
//! widgets' geometry.
//!
//! A [`Layout`] is a scalar expression, a [`Layout2d`] a pair of them. They
//! are built either from text (`"parent.width - 20"`, `"{50%, b1.bottom}"`)
//! or by combining handles with the arithmetic operators and the `bind_*`
//! functions. Values recompute synchronously whenever a widget they read
//! moves or resizes.
//!
//! ```rust,ignore
//! let sidebar = Panel::new();
//! sidebar.set_size("{200, parent.height}");
//! gui.add(sidebar.clone(), "sidebar");
//!
//! let content = Panel::new();
//! content.set_position(bind_position(&sidebar) + Layout2d::new(bind_width(&sidebar), 0.0));
//! content.set_size("{parent.width - sidebar.right, parent.height}");
//! gui.add(content, "content");
//! ```

mod bind;
mod error;
mod handle;
mod layout2d;
mod node;
mod operation;
mod parser;
mod resolve;

pub use bind::{
    BindTarget, bind_bottom, bind_height, bind_if, bind_if_2d, bind_left, bind_max, bind_min,
    bind_position, bind_range, bind_right, bind_size, bind_str, bind_str_2d, bind_top, bind_width,
};
pub use error::ExpressionError;
pub use handle::Layout;
pub use layout2d::{Axis, Layout2d};
pub use node::{ExpressionNode, NodeId};
pub use operation::Operation;
pub use parser::{parse, try_parse};
pub use resolve::{NoSubscriptions, Subscriber, Trigger};
