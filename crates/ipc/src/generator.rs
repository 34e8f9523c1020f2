//! Random password generator.

use {rand::Rng, serde::Deserialize};

pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DIGITS: &str = "0123456789";
pub const SYMBOLS: &str = "!@#$%^&*()-_=+[]{}|;:,.<>?";

/// Longest password the generator will produce.
pub const MAX_LENGTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    #[error("At least one character type must be selected")]
    NoCharacterClass,
    #[error("Password length must be between 1 and {MAX_LENGTH}")]
    InvalidLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorOptions {
    pub length: usize,
    #[serde(default)]
    pub include_uppercase: bool,
    #[serde(default)]
    pub include_lowercase: bool,
    #[serde(default)]
    pub include_numbers: bool,
    #[serde(default)]
    pub include_symbols: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 20,
            include_uppercase: true,
            include_lowercase: true,
            include_numbers: true,
            include_symbols: true,
        }
    }
}

impl GeneratorOptions {
    fn alphabet(&self) -> Vec<char> {
        [
            (self.include_uppercase, UPPERCASE),
            (self.include_lowercase, LOWERCASE),
            (self.include_numbers, DIGITS),
            (self.include_symbols, SYMBOLS),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .flat_map(|(_, chars)| chars.chars())
        .collect()
    }
}

/// Draw `options.length` characters uniformly from the enabled classes.
pub fn generate(options: &GeneratorOptions) -> Result<String, GeneratorError> {
    let alphabet = options.alphabet();
    if alphabet.is_empty() {
        return Err(GeneratorError::NoCharacterClass);
    }
    if options.length == 0 || options.length > MAX_LENGTH {
        return Err(GeneratorError::InvalidLength);
    }

    let mut rng = rand::rng();
    Ok((0..options.length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn only(upper: bool, lower: bool, numbers: bool, symbols: bool) -> GeneratorOptions {
        GeneratorOptions {
            length: 64,
            include_uppercase: upper,
            include_lowercase: lower,
            include_numbers: numbers,
            include_symbols: symbols,
        }
    }

    #[rstest]
    #[case::upper(only(true, false, false, false), UPPERCASE)]
    #[case::lower(only(false, true, false, false), LOWERCASE)]
    #[case::digits(only(false, false, true, false), DIGITS)]
    #[case::symbols(only(false, false, false, true), SYMBOLS)]
    fn honours_selected_class(#[case] options: GeneratorOptions, #[case] allowed: &str) {
        let password = generate(&options).unwrap();
        assert_eq!(password.chars().count(), 64);
        assert!(password.chars().all(|c| allowed.contains(c)), "{password}");
    }

    #[test]
    fn mixes_classes() {
        let options = GeneratorOptions {
            length: 512,
            ..Default::default()
        };
        let password = generate(&options).unwrap();
        assert!(password.chars().any(|c| c.is_ascii_uppercase()));
        assert!(password.chars().any(|c| c.is_ascii_lowercase()));
        assert!(password.chars().any(|c| c.is_ascii_digit()));
        assert!(password.chars().any(|c| SYMBOLS.contains(c)));
    }

    #[test]
    fn rejects_no_class() {
        assert_eq!(
            generate(&only(false, false, false, false)),
            Err(GeneratorError::NoCharacterClass)
        );
    }

    #[rstest]
    #[case::zero(0)]
    #[case::too_long(MAX_LENGTH + 1)]
    fn rejects_bad_length(#[case] length: usize) {
        let options = GeneratorOptions {
            length,
            ..Default::default()
        };
        assert_eq!(generate(&options), Err(GeneratorError::InvalidLength));
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let options: GeneratorOptions = serde_json::from_str(
            r#"{"length":16,"includeUppercase":true,"includeNumbers":true}"#,
        )
        .unwrap();
        assert_eq!(options.length, 16);
        assert!(options.include_uppercase);
        assert!(!options.include_lowercase);
        assert!(options.include_numbers);
        assert!(!options.include_symbols);
    }
}
