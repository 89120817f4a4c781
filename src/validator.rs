//! Free-text name validation and normalization.
//!
//! Upstream city and country fields are noisy free text. `normalize` turns a
//! city name into a canonical display form (or rejects it outright) and
//! `valid_city_name_syntax` is the cheap syntactic gate applied before any
//! network lookup.

/// Normalizes a raw city name: collapses whitespace, keeps only letters,
/// hyphens, apostrophes and spaces, then applies smart capitalization per
/// token and per hyphen-delimited sub-token. Returns `None` when nothing
/// usable remains.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_alphabetic() || matches!(c, '-' | '\'' | ' '))
        .collect();

    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }

    let name = cleaned
        .split(' ')
        .map(|token| {
            token
                .split('-')
                .map(smart_cap)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ");

    Some(name)
}

/// True only if the name holds at least 2 alphabetic characters; rejects
/// numeric codes, symbols and single-letter fragments while accepting short
/// real names like "LA".
pub fn valid_city_name_syntax(name: &str) -> bool {
    name.chars().filter(|c| c.is_alphabetic()).count() >= 2
}

/// Tidies a free-text country string: collapse whitespace, strip stray
/// punctuation, titlecase each token. Returns `None` when nothing remains.
pub fn tidy_country(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_alphabetic() || matches!(c, '-' | '\'' | ' '))
        .collect();

    let tidied = cleaned
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if tidied.is_empty() {
        None
    } else {
        Some(tidied)
    }
}

/// Capitalizes one word, keeping McDonald's-style words and acronyms intact:
/// an all-uppercase word of length >= 2 is preserved, and words beginning
/// with Mc/Mac/O' keep their casing when the first letter is already capital.
fn smart_cap(word: &str) -> String {
    if word.len() >= 2 && word.chars().all(|c| c.is_ascii_uppercase()) {
        return word.to_string();
    }

    let lower = word.to_lowercase();
    let starts_prefixed =
        lower.starts_with("mc") || lower.starts_with("mac") || lower.starts_with("o'");
    if starts_prefixed && word.chars().next().is_some_and(|c| !c.is_lowercase()) {
        return word.to_string();
    }

    capitalize(word)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("  new   york! ", "New York")]
    #[case("saint-louis", "Saint-Louis")]
    #[case("PARIS 75", "PARIS")]
    #[case("l'aquila", "L'Aquila")]
    #[case("McKinney", "McKinney")]
    #[case("MacLeod", "MacLeod")]
    #[case("mcdonald", "Mcdonald")]
    #[case("o'fallon", "O'fallon")]
    #[case("O'Fallon", "O'Fallon")]
    #[case("łódź", "Łódź")]
    fn normalizes_to_canonical_form(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw).as_deref(), Some(expected));
    }

    #[rstest]
    #[case("123")]
    #[case("$%^")]
    #[case("   ")]
    #[case("")]
    fn rejects_inputs_with_nothing_usable(#[case] raw: &str) {
        assert_eq!(normalize(raw), None);
    }

    #[rstest]
    #[case("New York")]
    #[case("Saint-Louis")]
    #[case("LA")]
    #[case("L'Aquila")]
    #[case("Łódź")]
    fn normalize_is_idempotent(#[case] canonical: &str) {
        let once = normalize(canonical).expect("valid name");
        assert_eq!(normalize(&once), Some(once.clone()));
    }

    #[test]
    fn syntax_accepts_short_real_names() {
        assert!(valid_city_name_syntax("LA"));
    }

    #[rstest]
    #[case("$%^")]
    #[case("A")]
    #[case("B-52")]
    #[case("42")]
    fn syntax_rejects_fragments(#[case] name: &str) {
        assert!(!valid_city_name_syntax(name));
    }

    #[rstest]
    #[case("  POLAND  ", "Poland")]
    #[case("united   kingdom", "United Kingdom")]
    #[case("france!", "France")]
    fn tidies_country_strings(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(tidy_country(raw).as_deref(), Some(expected));
    }

    #[test]
    fn empty_country_is_rejected() {
        assert_eq!(tidy_country(" 42 "), None);
    }
}
