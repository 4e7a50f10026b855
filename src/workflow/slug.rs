use std::collections::HashSet;

/// Lower-cases and trims `name`, joining whitespace runs with single hyphens.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Returns `base` if free, otherwise the first of `base-1`, `base-2`, ... not in `taken`.
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    let mut counter = 1u32;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_whitespace() {
        assert_eq!(slugify("  Gospel   Music "), "gospel-music");
        assert_eq!(slugify("Worship\tSongs\nLive"), "worship-songs-live");
        assert_eq!(slugify("Sermons"), "sermons");
    }

    #[test]
    fn repeated_names_get_increasing_suffixes() {
        let mut taken = HashSet::new();
        let mut issued = Vec::new();
        for _ in 0..3 {
            let slug = unique_slug(&slugify("name"), &taken);
            taken.insert(slug.clone());
            issued.push(slug);
        }
        assert_eq!(issued, vec!["name", "name-1", "name-2"]);
    }

    #[test]
    fn fills_first_free_suffix() {
        let taken: HashSet<String> = ["music", "music-1", "music-3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(unique_slug("music", &taken), "music-2");
        assert_eq!(unique_slug("sermons", &taken), "sermons");
    }
}
