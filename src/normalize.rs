//! Municipality-name normalization.
//!
//! Parcel rows and boundary files spell municipality names inconsistently
//! ("São Gonçalo do Amarante" vs "SAO GONCALO DO AMARANTE"), so every join
//! goes through the same key: NFKD-decompose, drop anything outside ASCII
//! (which removes the combining accents), lowercase.

use unicode_normalization::UnicodeNormalization;

/// Normalizes a municipality name into its join key. Idempotent.
pub fn normalize_municipio(name: &str) -> String {
    name.nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_lowercases() {
        assert_eq!(normalize_municipio("Fortaleza"), "fortaleza");
        assert_eq!(normalize_municipio("São Paulo"), "sao paulo");
        assert_eq!(normalize_municipio("Ceará"), "ceara");
        assert_eq!(normalize_municipio("CEARA"), "ceara");
        assert_eq!(normalize_municipio("Jijoca de Jericoacoara"), "jijoca de jericoacoara");
    }

    #[test]
    fn is_idempotent() {
        for name in ["Maracanaú", "Juazeiro do Norte", "Crateús"] {
            let once = normalize_municipio(name);
            assert_eq!(normalize_municipio(&once), once);
        }
    }

    #[test]
    fn equal_keys_for_accented_and_plain_spellings() {
        assert_eq!(
            normalize_municipio("Ceará"),
            normalize_municipio("CEARA")
        );
    }
}
