mod resource_form;
mod resource_list;

pub use resource_form::FormView;
pub use resource_list::{list_view, ListView};
