/// Suffixes the register appends to official district names, removed in order
const DISTRICT_SUFFIXES: [&str; 3] = [", Stadt", " der FernUniversität", ", Klingenstadt"];

/// Normalize a district name so it matches the population table
pub fn district(name: &str) -> String {
    DISTRICT_SUFFIXES
        .iter()
        .fold(name.to_string(), |name, suffix| name.replace(suffix, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_known_suffixes() {
        assert_eq!(district("Köln, Stadt"), "Köln");
        assert_eq!(district("Hagen, Stadt der FernUniversität"), "Hagen");
        assert_eq!(district("Solingen, Klingenstadt"), "Solingen");
    }

    #[test]
    fn test_leaves_other_names_untouched() {
        assert_eq!(district("Rhein-Sieg-Kreis"), "Rhein-Sieg-Kreis");
        assert_eq!(district("Städteregion Aachen"), "Städteregion Aachen");
        assert_eq!(district(" , Stadt"), " ");
    }
}
