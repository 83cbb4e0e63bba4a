use git2::Oid;
use serde::Deserialize;

/// Supplies the optional per-commit links shown next to each section.
pub trait UrlStrategy {
    /// Link to the built result of a commit, e.g. a deployed page.
    fn result_url(&self, id: Oid) -> Option<String>;

    /// Link to the source tree of a commit.
    fn source_url(&self, id: Oid) -> Option<String>;
}

/// URL strategy defined by two optional templates.
///
/// `{sha1}` expands to the full lowercase commit id and `{short}` to its
/// first seven characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateUrls {
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl TemplateUrls {
    /// Sample strategy linking to a deployed copy and a hosted source tree.
    pub fn example() -> Self {
        Self {
            result_url: Some("https://example.com/deploy/{sha1}/index.html".to_string()),
            source_url: Some("https://github.com/example/project/tree/{sha1}".to_string()),
        }
    }

    /// Sample strategy whose result links carry several query parameters.
    pub fn example_query() -> Self {
        Self {
            result_url: Some("https://example.com/show?colour=blue&sha1={sha1}".to_string()),
            source_url: None,
        }
    }

    fn expand(template: &Option<String>, id: Oid) -> Option<String> {
        let sha1 = id.to_string();
        let short = &sha1[..7.min(sha1.len())];
        template
            .as_ref()
            .map(|t| t.replace("{sha1}", &sha1).replace("{short}", short))
    }
}

impl UrlStrategy for TemplateUrls {
    fn result_url(&self, id: Oid) -> Option<String> {
        Self::expand(&self.result_url, id)
    }

    fn source_url(&self, id: Oid) -> Option<String> {
        Self::expand(&self.source_url, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Oid {
        Oid::from_str("6c02bd6b238ed84550bd5cee4fd0a94d9f344da1").unwrap()
    }

    #[test]
    fn expands_full_and_short_ids() {
        let urls = TemplateUrls {
            result_url: Some("https://r/{short}/{sha1}".into()),
            source_url: None,
        };
        assert_eq!(
            urls.result_url(id()).as_deref(),
            Some("https://r/6c02bd6/6c02bd6b238ed84550bd5cee4fd0a94d9f344da1")
        );
        assert_eq!(urls.source_url(id()), None);
    }

    #[test]
    fn parses_from_json_with_missing_fields() {
        let urls: TemplateUrls =
            serde_json::from_str(r#"{ "source_url": "https://s/{sha1}" }"#).unwrap();
        assert_eq!(urls.result_url, None);
        assert_eq!(urls.source_url.as_deref(), Some("https://s/{sha1}"));

        assert!(serde_json::from_str::<TemplateUrls>(r#"{ "results": "x" }"#).is_err());
    }
}
