mod command_input;
mod confirm;
mod input;
mod option_picker;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use input::{InputResult, TextInput};
pub use option_picker::{OptionPicker, PickerEvent};
pub use search_input::{SearchEvent, SearchInput};

/// Outcome of offering a key to a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key was consumed and produced an event for the parent
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
