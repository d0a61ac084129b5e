use deunicode::deunicode;

/// Turns a display name into a CamelCase slug made of ASCII letters and digits.
///
/// Non-ASCII text is transliterated first, anything else that is not
/// alphanumeric separates words.
pub fn slugify_camel(display_name: &str) -> String {
    deunicode(display_name)
        .split(|c: char| !c.is_ascii_alphanumeric())
        .flat_map(|word| {
            let mut chars = word.chars();
            let first = chars.next().map(|c| c.to_ascii_uppercase());
            first.into_iter().chain(chars)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::slugify_camel;

    #[test]
    fn words() {
        assert_eq!(
            slugify_camel("Office Secret Santa 2024"),
            "OfficeSecretSanta2024"
        );
    }

    #[test]
    fn lowercase_later_words() {
        assert_eq!(
            slugify_camel("Family christmas 2024"),
            "FamilyChristmas2024"
        );
    }

    #[test]
    fn punctuation() {
        assert_eq!(slugify_camel("Ho-ho-ho! (gifts & co.)"), "HoHoHoGiftsCo");
    }

    #[test]
    fn transliterated() {
        assert_eq!(slugify_camel("Тест Santa"), "TestSanta");
    }

    #[test]
    fn inner_capitals_survive() {
        assert_eq!(slugify_camel("the NYC office"), "TheNYCOffice");
    }

    #[test]
    fn nothing_left() {
        assert_eq!(slugify_camel("!!! ???"), "");
    }
}
