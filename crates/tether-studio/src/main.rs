use std::rc::Rc;

use anyhow::{Context, Result};
use tether_engine::logging::{LoggingConfig, init_logging};
use tether_ui::prelude::*;

/// Evaluated when no expressions are given on the command line.
const DEMO_EXPRESSIONS: &[&str] = &[
    "parent.width - sidebar.width",
    "sidebar.right + 10",
    "min(width, height) / 2",
    "range(100, 400, parent.w / 3)",
    "if sidebar.w > 150 then 1 else 0",
    "width > 500 ? width : 500",
    "(parent.width - 20",
];

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║          TETHER LAYOUT STUDIO          ║");
    println!("  ║   constraint layouts  ·  tether-ui     ║");
    println!("  ╚════════════════════════════════════════╝");
    println!();

    let gui = Gui::new(Vec2::new(800.0, 600.0));
    let (sidebar, content) = build_demo(&gui);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let expressions: Vec<&str> = if args.is_empty() {
        DEMO_EXPRESSIONS.to_vec()
    } else {
        args.iter().map(String::as_str).collect()
    };

    let context: WidgetRef = content.clone();
    println!("  Expressions evaluated against `content`:");
    for expression in &expressions {
        match try_parse(expression, Some(&context)) {
            Ok(value) => println!("    {expression:<36} = {value}"),
            Err(e) => println!("    {expression:<36} ! {e}"),
        }
    }
    println!();

    let header = content.get("header").context("demo tree has no `header` panel")?;
    print_geometry(&gui, &[("sidebar", &sidebar), ("content", &content), ("header", &header)]);
    for size in [Vec2::new(1024.0, 768.0), Vec2::new(320.0, 480.0)] {
        gui.set_view_size(size);
        print_geometry(&gui, &[("sidebar", &sidebar), ("content", &content), ("header", &header)]);
    }
    Ok(())
}

/// A sidebar clamped between 150 and 300 pixels and a content area filling
/// the rest of the view.
fn build_demo(gui: &Gui) -> (Rc<Panel>, Rc<Panel>) {
    let sidebar = Panel::new();
    gui.add(sidebar.clone(), "sidebar");
    sidebar.set_size(Layout2d::new(
        bind_range(150.0, 300.0, bind_width(gui) / 4.0),
        bind_height(gui),
    ));

    let content = Panel::new();
    gui.add(content.clone(), "content");
    content.set_position("{sidebar.right, 0}");
    content.set_size("{parent.width - sidebar.width, parent.height}");

    let header = Panel::new();
    content.add(header.clone(), "header");
    header.set_size("{100%, max(40, 10%)}");

    (sidebar, content)
}

fn print_geometry(gui: &Gui, panels: &[(&str, &Rc<Panel>)]) {
    let view = gui.view_size();
    log::debug!("printing geometry for {} panels", panels.len());
    println!("  view {}x{}", view.x, view.y);
    for (name, panel) in panels {
        let (position, size) = (panel.absolute_position(), panel.size());
        println!(
            "    {name:<8} at ({}, {})  size {}x{}",
            position.x, position.y, size.x, size.y
        );
    }
    println!();
}
