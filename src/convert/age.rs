//! Cat age <-> human age
//!
//! Piecewise linear mapping: the first cat year counts as 15 human years,
//! the second as 9 more, and every year after that as 4. Both directions
//! are continuous at the breakpoints and exact inverses of each other.

/// Human years reached at the end of the first cat year
const FIRST_YEAR: f64 = 15.0;
/// Human years reached at the end of the second cat year
const SECOND_YEAR: f64 = 24.0;
/// Human years added by the second cat year
const SECOND_YEAR_RATE: f64 = SECOND_YEAR - FIRST_YEAR;
/// Human years per cat year after the second
const LATER_RATE: f64 = 4.0;

/// Convert a cat's age in years to the equivalent human age
pub fn cat_to_human(cat: f64) -> f64 {
    if cat <= 0.0 {
        0.0
    } else if cat <= 1.0 {
        FIRST_YEAR * cat
    } else if cat <= 2.0 {
        FIRST_YEAR + (cat - 1.0) * SECOND_YEAR_RATE
    } else {
        SECOND_YEAR + (cat - 2.0) * LATER_RATE
    }
}

/// Convert a human age in years to the equivalent cat age
pub fn human_to_cat(human: f64) -> f64 {
    if human <= 0.0 {
        0.0
    } else if human <= FIRST_YEAR {
        human / FIRST_YEAR
    } else if human <= SECOND_YEAR {
        1.0 + (human - FIRST_YEAR) / SECOND_YEAR_RATE
    } else {
        2.0 + (human - SECOND_YEAR) / LATER_RATE
    }
}

/// Life stage derived from a human-equivalent age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeStage {
    Kitten,
    Juvenile,
    Adult,
    Senior,
}

impl LifeStage {
    /// Classify a human-equivalent age. Returns `None` for non-finite input.
    pub fn from_human_age(human: f64) -> Option<Self> {
        if !human.is_finite() {
            return None;
        }
        Some(if human < 2.0 {
            Self::Kitten
        } else if human < 15.0 {
            Self::Juvenile
        } else if human < 45.0 {
            Self::Adult
        } else {
            Self::Senior
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kitten => "Kitten",
            Self::Juvenile => "Juvenile / young adult",
            Self::Adult => "Adult",
            Self::Senior => "Senior",
        }
    }

    /// Short care hint shown next to the converted age
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Kitten => "Kitten stage (needs careful looking after)",
            Self::Juvenile => "Growing from juvenile to young adult",
            Self::Adult => "Prime adult years",
            Self::Senior => "Senior stage (keep an eye on health)",
        }
    }
}

impl std::fmt::Display for LifeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
