//! A minimal terminal interface: pick serial devices, then watch a run until
//! a key is pressed.

mod device_selector;
mod error;
mod fold_until_stop;

pub use device_selector::device_selector;
pub use error::GuiError;
pub use fold_until_stop::fold_until_stop;
