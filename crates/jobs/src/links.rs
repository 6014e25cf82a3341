//! Screenshot artifact paths → caller-facing URLs.

use std::path::Path;

use url::Url;

/// Derive the public URL for a screenshot artifact.
///
/// The artifact must live under `static_root`; its relative path is joined
/// onto `base_url` as `static/<rel>`. Returns `None` when there is no base
/// URL, the artifact lies outside the static root, or the join fails.
/// Callers treat that as "no link", never as a location failure.
pub fn derive_screenshot_url(
    base_url: Option<&str>,
    static_root: &Path,
    artifact: &str,
) -> Option<String> {
    let base = Url::parse(base_url?).ok()?;
    let rel = Path::new(artifact).strip_prefix(static_root).ok()?;
    let rel = rel.to_str()?.replace('\\', "/");
    base.join(&format!("static/{rel}")).ok().map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_artifact_onto_base() {
        let url = derive_screenshot_url(
            Some("http://api.example.com:8000/"),
            Path::new("static"),
            "static/images/traffic_screenshots/shot_pinned.png",
        );
        assert_eq!(
            url.as_deref(),
            Some("http://api.example.com:8000/static/images/traffic_screenshots/shot_pinned.png")
        );
    }

    #[test]
    fn base_url_path_is_preserved() {
        let url = derive_screenshot_url(
            Some("https://example.com/traffic/"),
            Path::new("static"),
            "static/images/a.png",
        );
        assert_eq!(url.as_deref(), Some("https://example.com/traffic/static/images/a.png"));
    }

    #[test]
    fn artifact_outside_static_root_is_none() {
        let url = derive_screenshot_url(
            Some("http://api.example.com/"),
            Path::new("static"),
            "/tmp/escaped.png",
        );
        assert_eq!(url, None);
    }

    #[test]
    fn missing_or_invalid_base_is_none() {
        assert_eq!(
            derive_screenshot_url(None, Path::new("static"), "static/a.png"),
            None
        );
        assert_eq!(
            derive_screenshot_url(Some("not a url"), Path::new("static"), "static/a.png"),
            None
        );
    }
}
