pub mod field;
pub mod form;
pub mod rule;
pub mod schedule;

pub use field::{Field, FieldOption, FieldType, field_name_for};
pub use form::{Form, Section};
pub use rule::{ANY_CHOICE, FieldRule};
pub use schedule::Schedule;
