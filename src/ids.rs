//! Identifier derivation for catalog entries and logged meals.
//!
//! Food ids are readable slugs (`apple-483920`), meal ids encode the meal
//! timestamp (`meal-2025-05-06-1432-59-k3f`). Neither is globally unique by
//! construction; the trailing digits/suffix keep collisions unlikely within
//! the same second.

use chrono::{DateTime, Utc};
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Replace Cyrillic letters with Latin equivalents, leaving everything else
/// untouched. Covers Russian plus the Ukrainian/Belarusian letters є і ї ґ.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match cyrillic_to_latin(ch) {
            Some(mapped) => out.push_str(mapped),
            None => out.push(ch),
        }
    }
    out
}

fn cyrillic_to_latin(ch: char) -> Option<&'static str> {
    let mapped = match ch {
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d",
        'е' => "e", 'ё' => "yo", 'ж' => "zh", 'з' => "z", 'и' => "i",
        'й' => "y", 'к' => "k", 'л' => "l", 'м' => "m", 'н' => "n",
        'о' => "o", 'п' => "p", 'р' => "r", 'с' => "s", 'т' => "t",
        'у' => "u", 'ф' => "f", 'х' => "h", 'ц' => "ts", 'ч' => "ch",
        'ш' => "sh", 'щ' => "sch", 'ъ' => "", 'ы' => "y", 'ь' => "",
        'э' => "e", 'ю' => "yu", 'я' => "ya",
        'є' => "ye", 'і' => "i", 'ї' => "yi", 'ґ' => "g",
        'А' => "A", 'Б' => "B", 'В' => "V", 'Г' => "G", 'Д' => "D",
        'Е' => "E", 'Ё' => "YO", 'Ж' => "ZH", 'З' => "Z", 'И' => "I",
        'Й' => "Y", 'К' => "K", 'Л' => "L", 'М' => "M", 'Н' => "N",
        'О' => "O", 'П' => "P", 'Р' => "R", 'С' => "S", 'Т' => "T",
        'У' => "U", 'Ф' => "F", 'Х' => "H", 'Ц' => "TS", 'Ч' => "CH",
        'Ш' => "SH", 'Щ' => "SCH", 'Ъ' => "", 'Ы' => "Y", 'Ь' => "",
        'Э' => "E", 'Ю' => "YU", 'Я' => "YA",
        'Є' => "YE", 'І' => "I", 'Ї' => "YI", 'Ґ' => "G",
        _ => return None,
    };
    Some(mapped)
}

/// Turn free text into a lowercase hyphenated slug.
///
/// Transliterates first, then keeps ASCII word characters, turns whitespace
/// and hyphen runs into single hyphens, and drops everything else.
pub fn slugify(text: &str) -> String {
    let transliterated = transliterate(text);
    let lowered = transliterated.to_lowercase();

    let mut slug = String::with_capacity(lowered.len());
    for ch in lowered.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch);
        }
        // Everything else (punctuation, emoji, non-Latin scripts that were
        // not transliterated) is dropped.
    }

    slug.trim_matches('-').to_string()
}

/// Derive a food-item id from its name: `<slug>-<last 6 digits of epoch ms>`.
///
/// Falls back to `food-<digits>` when the name slugs to nothing.
pub fn generate_food_id(name: &str) -> String {
    let slug = slugify(name);
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];

    if slug.is_empty() {
        format!("food-{}", tail)
    } else {
        format!("{}-{}", slug, tail)
    }
}

/// Format a timestamp as `YYYY-MM-DD-HHMM-SS` (UTC), the date segment of
/// meal ids.
pub fn format_date_for_id(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d-%H%M-%S").to_string()
}

/// Derive a human-readable meal id: `<prefix>-<date segment>-<3 base-36 chars>`.
///
/// The random suffix separates meals logged within the same second; it is not
/// checked against existing ids.
pub fn generate_meal_id(prefix: &str, timestamp: Option<DateTime<Utc>>) -> String {
    let date_str = format_date_for_id(timestamp.unwrap_or_else(Utc::now));

    let mut rng = rand::rng();
    let suffix: String = (0..3)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();

    format!("{}-{}-{}", prefix, date_str, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transliterate_russian() {
        assert_eq!(transliterate("борщ"), "borsch");
        assert_eq!(transliterate("Яблоко"), "YAbloko");
        assert_eq!(transliterate("hello"), "hello");
    }

    #[test]
    fn test_transliterate_ukrainian_letters() {
        assert_eq!(transliterate("їжа"), "yizha");
        assert_eq!(transliterate("ґанок"), "ganok");
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Apple Pie"), "apple-pie");
        assert_eq!(slugify("  Brown   Rice  "), "brown-rice");
        assert_eq!(slugify("Chicken-Breast"), "chicken-breast");
    }

    #[test]
    fn test_slugify_strips_special_characters() {
        assert_eq!(slugify("Mac & Cheese!"), "mac-cheese");
        assert_eq!(slugify("50% yogurt"), "50-yogurt");
    }

    #[test]
    fn test_slugify_cyrillic() {
        assert_eq!(slugify("Гречневая каша"), "grechnevaya-kasha");
    }

    #[test]
    fn test_slugify_empty_and_symbol_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_generate_food_id_shape() {
        let id = generate_food_id("Apple");
        let (slug, tail) = id.rsplit_once('-').unwrap();
        assert_eq!(slug, "apple");
        assert_eq!(tail.len(), 6);
        assert!(tail.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_food_id_falls_back_for_empty_slug() {
        let id = generate_food_id("!!!");
        assert!(id.starts_with("food-"));
    }

    #[test]
    fn test_format_date_for_id() {
        let ts = Utc.with_ymd_and_hms(2025, 5, 6, 14, 32, 59).unwrap();
        assert_eq!(format_date_for_id(ts), "2025-05-06-1432-59");
    }

    #[test]
    fn test_generate_meal_id_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let id = generate_meal_id("meal", Some(ts));

        assert!(id.starts_with("meal-2025-01-01-0800-00-"));
        let suffix = id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 3);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_meal_ids_in_same_second_differ() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let ids: std::collections::HashSet<String> =
            (0..20).map(|_| generate_meal_id("meal", Some(ts))).collect();
        // 36^3 suffixes make a 20-way collision effectively impossible.
        assert!(ids.len() > 1);
    }
}
