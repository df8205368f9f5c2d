use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strips diacritics so accented and unaccented spellings dispatch identically.
///
/// "Développeur" and "Developpeur" both become "Developpeur". Idempotent.
pub fn normalize_text(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_accents() {
        assert_eq!(normalize_text("Développeur"), "Developpeur");
        assert_eq!(normalize_text("Montréal, Québec"), "Montreal, Quebec");
        assert_eq!(normalize_text("Trois-Rivières"), "Trois-Rivieres");
    }

    #[test]
    fn test_accented_and_plain_inputs_match() {
        assert_eq!(normalize_text("Développeur"), normalize_text("Developpeur"));
    }

    #[test]
    fn test_idempotent() {
        for input in ["Développeur Java", "Ingénieur logiciel", "plain", ""] {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn test_plain_ascii_unchanged() {
        assert_eq!(normalize_text("Software Developer"), "Software Developer");
    }
}
