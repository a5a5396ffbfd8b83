//! Subviews - Child view registry for composite views.
//!
//! A host view embeds a [`SubViews`] field and implements [`Composite`];
//! that gives it:
//!
//! - `add_sub_views(view | list)` - Register existing views
//! - `init_sub_view(constructor, options)` - Construct and register
//! - `attach_sub_views(selector, factory)` - One view per matched element
//! - `get_sub_view(id | handle)` / `get_sub_views()` - Lookup
//! - `remove_sub_view(id | handle)` / `remove_sub_views(list)` / `remove_all_sub_views()`
//! - `remove_with_sub_views()` - Cascading teardown for the host's own `remove`
//!
//! A registered child that triggers `remove` or `dispose` drops out of the
//! registry by itself.
//!
//! ```ignore
//! let list = CompositeView::new(ViewOptions { tag_name: "ul".into(), ..Default::default() });
//!
//! list.attach_sub_views("li", |ctx| Rc::new(ItemView::new(ViewOptions::with_el(ctx.element))))?;
//! let item = list.get_sub_views()[0].clone();
//! item.trigger("remove"); // gone from the registry
//!
//! list.remove(); // removes every remaining item first
//! ```

mod composite;
mod registry;

pub use composite::{AttachContext, Composite, CompositeView};
pub use registry::{IntoSubView, IntoSubViews, SubView, SubViews};
