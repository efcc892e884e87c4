pub mod function;
pub mod value;

pub use function::{Function, Lambda, TermMethod};
pub use value::{ConversionError, Value};
