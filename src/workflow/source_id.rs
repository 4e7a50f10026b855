use url::Url;

const SHORT_LINK_HOSTS: [&str; 2] = ["youtu.be", "www.youtu.be"];
const CANONICAL_HOSTS: [&str; 3] = ["www.youtube.com", "youtube.com", "m.youtube.com"];

/// Pulls the platform video id out of a submitted link.
///
/// Accepts `youtu.be/<id>` short links and `youtube.com/watch?v=<id>` canonical links, with or
/// without a scheme. Anything else yields `None`, which callers treat as invalid input.
pub fn extract_source_id(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let with_scheme = if link.contains("://") {
        link.to_string()
    } else {
        format!("https://{}", link)
    };

    let url = Url::parse(&with_scheme).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_lowercase();

    let id = if SHORT_LINK_HOSTS.contains(&host.as_str()) {
        url.path_segments()?
            .next()
            .and_then(|segment| segment.split('&').next())
            .map(str::to_string)
    } else if CANONICAL_HOSTS.contains(&host.as_str()) {
        url.query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    } else {
        None
    };

    id.filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_canonical_links_agree() {
        let forms = [
            "https://youtu.be/dQw4w9WgXcQ",
            "http://youtu.be/dQw4w9WgXcQ?t=42",
            "youtu.be/dQw4w9WgXcQ",
            "https://www.youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1",
            "www.youtube.com/watch?v=dQw4w9WgXcQ",
            "  https://www.youtube.com/watch?v=dQw4w9WgXcQ  ",
        ];
        for form in forms {
            assert_eq!(
                extract_source_id(form).as_deref(),
                Some("dQw4w9WgXcQ"),
                "form {form}"
            );
        }
    }

    #[test]
    fn other_shapes_are_unrecognized() {
        let forms = [
            "",
            "not a url",
            "https://vimeo.com/12345",
            "https://www.youtube.com/watch",
            "https://www.youtube.com/watch?v=",
            "https://www.youtube.com/channel/UC123",
            "https://youtu.be/",
            "ftp://youtu.be/dQw4w9WgXcQ",
            "https://notyoutube.com/watch?v=dQw4w9WgXcQ",
        ];
        for form in forms {
            assert_eq!(extract_source_id(form), None, "form {form}");
        }
    }
}
