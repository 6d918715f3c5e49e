pub mod item;
pub mod language;
pub mod query;

pub use item::*;
pub use language::{canonical_language, is_all_languages};
pub use query::*;
