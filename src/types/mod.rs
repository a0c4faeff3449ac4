//! Physical types and row values.

mod physical;
mod value;

pub use physical::PhysicalType;
pub use value::{Datum, Record, Value};
