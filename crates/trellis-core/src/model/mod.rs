pub mod entity;
pub mod kind;
pub mod properties;

pub use entity::{is_identifier, Entity};
pub use kind::EntityKind;
pub use properties::PropertyMap;
