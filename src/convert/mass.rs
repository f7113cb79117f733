//! Kilogram <-> pound and kilogram <-> jin

/// Pounds per kilogram
pub const KG_TO_LB: f64 = 2.20462262185;

/// Jin per kilogram (one jin is half a kilogram)
pub const KG_TO_JIN: f64 = 2.0;

pub fn kg_to_lb(kg: f64) -> f64 {
    kg * KG_TO_LB
}

pub fn lb_to_kg(lb: f64) -> f64 {
    lb / KG_TO_LB
}

pub fn kg_to_jin(kg: f64) -> f64 {
    kg * KG_TO_JIN
}

pub fn jin_to_kg(jin: f64) -> f64 {
    jin / KG_TO_JIN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pounds() {
        assert!((kg_to_lb(1.0) - 2.2).abs() < 0.01);
        assert!((lb_to_kg(2.20462262185) - 1.0).abs() < 1e-12);
        assert!((lb_to_kg(kg_to_lb(4.2)) - 4.2).abs() < 1e-12);
    }

    #[test]
    fn test_jin() {
        assert_eq!(kg_to_jin(1.0), 2.0);
        assert_eq!(jin_to_kg(2.0), 1.0);
        assert_eq!(kg_to_jin(4.5), 9.0);
        assert_eq!(jin_to_kg(0.0), 0.0);
    }
}
