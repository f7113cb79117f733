//! Paired text fields
//!
//! Each converter screen is two text fields bound by a conversion. Editing
//! either field rewrites the other one. Bad input is never an error: it is
//! stripped down to digits and dots, and anything that still fails to parse
//! leaves the partner field alone.

use super::age::{cat_to_human, human_to_cat, LifeStage};
use super::mass::{jin_to_kg, kg_to_jin, kg_to_lb, lb_to_kg};

/// A bidirectional conversion between two units
pub trait Conversion {
    /// Label for the primary field
    const PRIMARY: &'static str;
    /// Label for the secondary field
    const SECONDARY: &'static str;

    fn forward(value: f64) -> f64;
    fn backward(value: f64) -> f64;
}

/// Cat years <-> human years
#[derive(Debug, Clone, Copy)]
pub struct AgeConversion;

impl Conversion for AgeConversion {
    const PRIMARY: &'static str = "cat years";
    const SECONDARY: &'static str = "human years";

    fn forward(value: f64) -> f64 {
        cat_to_human(value)
    }

    fn backward(value: f64) -> f64 {
        human_to_cat(value)
    }
}

/// Kilograms <-> pounds
#[derive(Debug, Clone, Copy)]
pub struct PoundConversion;

impl Conversion for PoundConversion {
    const PRIMARY: &'static str = "kg";
    const SECONDARY: &'static str = "lb";

    fn forward(value: f64) -> f64 {
        kg_to_lb(value)
    }

    fn backward(value: f64) -> f64 {
        lb_to_kg(value)
    }
}

/// Kilograms <-> jin
#[derive(Debug, Clone, Copy)]
pub struct JinConversion;

impl Conversion for JinConversion {
    const PRIMARY: &'static str = "kg";
    const SECONDARY: &'static str = "jin";

    fn forward(value: f64) -> f64 {
        kg_to_jin(value)
    }

    fn backward(value: f64) -> f64 {
        jin_to_kg(value)
    }
}

/// Round half up to one decimal and print without trailing zeros.
///
/// Non-finite values format as an empty string.
pub fn format_one_decimal(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rounded = (value * 10.0).round() / 10.0;
    // -0.0 would otherwise print as "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    rounded.to_string()
}

/// Keep only ASCII digits and dots
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Parse the longest leading number: digits with at most one dot.
///
/// `"1.2.3"` parses as `1.2`, `"5."` as `5`; `"."` and `""` do not parse.
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    let prefix = &text[..end];
    if !prefix.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// The two text fields of one converter
#[derive(Debug, Clone)]
pub struct PairedFields<C> {
    primary: String,
    secondary: String,
    _conversion: std::marker::PhantomData<C>,
}

impl<C: Conversion> PairedFields<C> {
    pub fn new() -> Self {
        Self {
            primary: String::new(),
            secondary: String::new(),
            _conversion: std::marker::PhantomData,
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    /// User typed into the primary field
    pub fn edit_primary(&mut self, raw: &str) {
        Self::edit(raw, &mut self.primary, &mut self.secondary, C::forward);
    }

    /// User typed into the secondary field
    pub fn edit_secondary(&mut self, raw: &str) {
        Self::edit(raw, &mut self.secondary, &mut self.primary, C::backward);
    }

    fn edit(raw: &str, edited: &mut String, partner: &mut String, convert: fn(f64) -> f64) {
        *edited = sanitize(raw);
        if edited.is_empty() {
            partner.clear();
            return;
        }
        match parse_leading_number(edited) {
            Some(value) => *partner = format_one_decimal(convert(value)),
            None => log::trace!("Ignoring unparseable input {:?}", edited),
        }
    }
}

impl<C: Conversion> Default for PairedFields<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl PairedFields<AgeConversion> {
    /// Life stage for whatever the human-years field currently holds
    pub fn life_stage(&self) -> Option<LifeStage> {
        parse_leading_number(&self.secondary).and_then(LifeStage::from_human_age)
    }
}
