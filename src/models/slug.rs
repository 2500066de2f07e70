//! URL slug helpers shared by recipes and articles.

/// Fold the accented letters found in French titles to ASCII.
fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' | 'å' => "a",
        'ç' => "c",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'î' | 'ï' | 'í' | 'ì' => "i",
        'ô' | 'ö' | 'ó' | 'ò' | 'õ' => "o",
        'ù' | 'û' | 'ü' | 'ú' => "u",
        'ÿ' | 'ý' => "y",
        'ñ' => "n",
        'œ' => "oe",
        'æ' => "ae",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

/// Build a slug from a free-form title: `"Tarte au citron meringuée"` becomes
/// `"tarte-au-citron-meringuee"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        let piece = if c.is_ascii_alphanumeric() {
            Some(c.to_string())
        } else {
            fold_accent(c).map(str::to_string)
        };

        match piece {
            Some(p) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push_str(&p);
            }
            None => pending_dash = true,
        }
    }

    slug
}

/// Slugs are lowercase ASCII words joined by single dashes.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Use the submitted slug when present, otherwise derive one from the title.
pub fn resolve_slug(slug: Option<&str>, title: &str) -> Result<String, String> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => slugify(title),
    };

    if is_valid_slug(&slug) {
        Ok(slug)
    } else {
        Err(format!(
            "Invalid slug '{}': use lowercase letters, digits and single dashes",
            slug
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Tarte au citron meringuée"), "tarte-au-citron-meringuee");
        assert_eq!(slugify("  Crème brûlée !! "), "creme-brulee");
        assert_eq!(slugify("Bûche de Noël 2024"), "buche-de-noel-2024");
        assert_eq!(slugify("Œufs à la neige"), "oeufs-a-la-neige");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("tarte"));
        assert!(is_valid_slug("paris-brest-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Tarte"));
        assert!(!is_valid_slug("tarte--citron"));
        assert!(!is_valid_slug("-tarte"));
        assert!(!is_valid_slug("tarte citron"));
    }

    #[test]
    fn test_resolve_slug() {
        assert_eq!(resolve_slug(None, "Mille-feuille").unwrap(), "mille-feuille");
        assert_eq!(resolve_slug(Some("  "), "Éclair").unwrap(), "eclair");
        assert_eq!(resolve_slug(Some("custom"), "Éclair").unwrap(), "custom");
        assert!(resolve_slug(Some("Bad Slug"), "x").is_err());
        assert!(resolve_slug(None, "!!!").is_err());
    }
}
