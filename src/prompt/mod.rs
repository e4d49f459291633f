//! Request composition: theme and accessory tables plus the composer.

mod accessory;
mod composer;
mod theme;

pub use accessory::{Accessory, AccessorySet};
pub use composer::{accessory_clause, compose_request, ComposedRequest, Mode, Selection, ThemeChoice};
pub use theme::{Theme, ThemePreset};
