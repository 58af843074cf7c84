pub mod markup;
pub mod plan;

pub use markup::{parse_document, Element, Markup};
pub use plan::lower;
