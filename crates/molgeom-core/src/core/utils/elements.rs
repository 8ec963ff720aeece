use phf::{Map, phf_map};

static VALENCES: Map<&'static str, u8> = phf_map! {
    "H" => 1, "D" => 1, "T" => 1,
    "B" => 3,
    "C" => 4, "Si" => 4, "Ge" => 4,
    "N" => 3, "P" => 3, "As" => 3,
    "O" => 2, "S" => 2, "Se" => 2,
    "F" => 1, "Cl" => 1, "Br" => 1, "I" => 1,
    "He" => 0, "Ne" => 0, "Ar" => 0, "Kr" => 0, "Xe" => 0,
};

fn normalize(symbol: &str) -> String {
    let symbol = symbol.trim();
    let mut chars = symbol.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Standard valence of an element, or `None` for elements outside the table.
pub fn valence(symbol: &str) -> Option<u8> {
    VALENCES.get(normalize(symbol).as_str()).copied()
}

pub fn is_hydrogen(symbol: &str) -> bool {
    matches!(normalize(symbol).as_str(), "H" | "D" | "T")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valence_returns_standard_values() {
        assert_eq!(valence("C"), Some(4));
        assert_eq!(valence("N"), Some(3));
        assert_eq!(valence("O"), Some(2));
        assert_eq!(valence("H"), Some(1));
        assert_eq!(valence("Cl"), Some(1));
    }

    #[test]
    fn valence_is_case_insensitive_and_trims() {
        assert_eq!(valence(" cl "), Some(1));
        assert_eq!(valence("SI"), Some(4));
    }

    #[test]
    fn valence_of_unknown_element_is_none() {
        assert_eq!(valence("Fe"), None);
        assert_eq!(valence(""), None);
    }

    #[test]
    fn is_hydrogen_recognizes_isotopes() {
        assert!(is_hydrogen("H"));
        assert!(is_hydrogen("d"));
        assert!(!is_hydrogen("He"));
        assert!(!is_hydrogen("C"));
    }
}
