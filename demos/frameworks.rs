//! Frameworks Example - A list whose items remove themselves
//!
//! This example demonstrates:
//! - A composite list view building its items with `add_sub_views`
//! - Items announcing their own removal with a `remove` event
//! - Re-attaching views to existing markup with `attach_sub_views`
//! - Reacting to the registry size through a signal
//! - Cascading teardown when the application view is removed
//!
//! Run with: cargo run --example frameworks

use std::rc::Rc;

use spark_signals::effect;
use spark_subviews::{
    Composite, CompositeView, Element, SubViews, View, ViewCore, ViewOptions,
};
use tracing::info;

const FRAMEWORKS: &[&str] = &["Backbone", "Ember", "Angular", "React", "Vue"];

// =============================================================================
// FrameworkView
// =============================================================================

/// One framework card.
struct FrameworkView {
    core: ViewCore,
    name: String,
}

impl FrameworkView {
    fn new(name: &str, options: ViewOptions) -> Self {
        Self {
            core: ViewCore::new(options),
            name: name.to_string(),
        }
    }

    fn card(name: &str) -> Self {
        Self::new(
            name,
            ViewOptions {
                class_name: Some("col-sm-6 col-md-4".to_string()),
                ..ViewOptions::default()
            },
        )
    }

    fn render(&self) {
        self.el().empty();
        self.el().set_attr("data-name", self.name.as_str());
        self.el().append(&Element::new("h3").with_text(self.name.as_str()));
        self.el().append(&Element::new("a").with_class("remove").with_text("Remove"));
    }
}

impl View for FrameworkView {
    fn core(&self) -> &ViewCore {
        &self.core
    }

    fn remove(&self) {
        if self.core.remove() {
            self.trigger("remove");
        }
    }
}

// =============================================================================
// FrameworksView
// =============================================================================

/// The framework list.
struct FrameworksView {
    core: ViewCore,
    sub_views: SubViews,
}

impl FrameworksView {
    fn new(options: ViewOptions) -> Self {
        Self {
            core: ViewCore::new(options),
            sub_views: SubViews::new(),
        }
    }

    fn render(&self, names: &[&str]) {
        self.el().empty();
        let container = Element::new("div").with_class("row js-frameworks");
        self.el().append(&container);

        let cards: Vec<Rc<FrameworkView>> = names
            .iter()
            .map(|name| {
                let card = Rc::new(FrameworkView::card(name));
                card.render();
                container.append(card.el());
                card
            })
            .collect();

        self.add_sub_views(cards);
    }
}

impl View for FrameworksView {
    fn core(&self) -> &ViewCore {
        &self.core
    }

    fn remove(&self) {
        self.remove_with_sub_views();
    }
}

impl Composite for FrameworksView {
    fn sub_views(&self) -> &SubViews {
        &self.sub_views
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    println!("=== spark-subviews Frameworks Example ===\n");

    let body = Element::new("body");
    let app = CompositeView::new(ViewOptions::with_el(Element::new("div").with_id("main")));
    body.append(app.el());

    let frameworks = app.init_sub_view(FrameworksView::new, ViewOptions::default());
    app.el().append(frameworks.el());

    let count = frameworks.sub_views().count_signal();
    let _effect = effect(move || {
        info!(count = count.get(), "frameworks on screen");
    });

    frameworks.render(FRAMEWORKS);
    println!("Rendered:\n{}\n", body.to_markup());

    // Clicking "Remove" on a card
    if let Some(card) = frameworks.get_sub_views().into_iter().next() {
        let name = card.el().attr("data-name").unwrap_or_default();
        card.remove();
        println!("Removed {name}, {} cards left", frameworks.sub_view_count());
    }

    // Markup rendered elsewhere can be picked up again
    let restored = CompositeView::default();
    for name in ["Svelte", "Solid"] {
        restored
            .el()
            .append(&Element::new("div").with_class("card").with_attr("data-name", name));
    }
    restored.attach_sub_views(".card", |ctx| {
        let name = ctx.element.attr("data-name").unwrap_or_default();
        println!("Attaching card #{} ({name})", ctx.index);
        Rc::new(FrameworkView::new(&name, ViewOptions::with_el(ctx.element)))
    })?;
    println!("Attached {} cards", restored.sub_view_count());

    app.add_sub_views(Rc::new(restored));
    app.remove();

    println!("\nAfter removing the app:");
    println!("  frameworks left: {}", frameworks.sub_view_count());
    println!("  app attached: {}", app.el().is_attached());
    println!("  body: {}", body.to_markup());

    Ok(())
}
