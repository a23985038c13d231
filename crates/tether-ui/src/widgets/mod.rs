mod gui;
mod panel;

pub use gui::Gui;
pub use panel::Panel;
