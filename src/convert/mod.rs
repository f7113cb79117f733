//! Convert module - the cat age and cat weight calculators
//!
//! This module provides:
//! - Cat age <-> human age mapping and life stages
//! - Kilogram <-> pound / jin conversion
//! - The paired text-field model both calculators share

mod age;
mod field;
mod mass;

pub use age::{cat_to_human, human_to_cat, LifeStage};
pub use field::{
    format_one_decimal, parse_leading_number, sanitize, AgeConversion, Conversion,
    JinConversion, PairedFields, PoundConversion,
};
pub use mass::{jin_to_kg, kg_to_jin, kg_to_lb, lb_to_kg};
