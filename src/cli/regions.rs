//! `regions` command: list the live regions of a document.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::config::LiveConfig;
use crate::dom::{Document, Selector};
use crate::live::{REGION_TAG, Region};

/// One region as declared in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub identifier: Option<String>,
    pub url: String,
    pub only: Option<String>,
    pub debounce: Option<String>,
}

/// Regions of `document` in document order.
pub fn collect(document: &Document, location: &str) -> Vec<RegionInfo> {
    document
        .query_selector_all(document.root(), &Selector::tag(REGION_TAG))
        .into_iter()
        .map(|element| {
            let region = Region::new(element);
            let attr = |name: &str| document.attr(element, name).map(str::to_string);
            RegionInfo {
                identifier: region.identifier(document).map(str::to_string),
                url: region.url(document, location),
                only: attr("only"),
                debounce: attr("debounce"),
            }
        })
        .collect()
}

pub fn run(config: &LiveConfig, path: &Path) -> Result<()> {
    let html = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let document = Document::parse(&html);
    let location = config.fetch.location.as_deref().unwrap_or("(location)");
    let regions = collect(&document, location);

    if regions.is_empty() {
        crate::log!("regions"; "no <{}> elements in {}", REGION_TAG, path.display());
        return Ok(());
    }

    for (n, region) in regions.iter().enumerate() {
        let identifier = match &region.identifier {
            Some(identifier) => identifier.bold().to_string(),
            None => "missing identifier".red().to_string(),
        };
        let mut line = format!("{:>3}. {} {}", n + 1, identifier, region.url.dimmed());
        if let Some(only) = &region.only {
            line.push_str(&format!(" only={only}"));
        }
        if let Some(debounce) = &region.debounce {
            line.push_str(&format!(" debounce={debounce}ms"));
        }
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_regions() {
        let document = Document::parse(
            r#"<body><updates-for identifier="a" only="title body"></updates-for><updates-for url="/x" debounce="50"></updates-for></body>"#,
        );

        let regions = collect(&document, "http://app.test/");

        assert_eq!(
            regions,
            vec![
                RegionInfo {
                    identifier: Some("a".into()),
                    url: "http://app.test/".into(),
                    only: Some("title body".into()),
                    debounce: None,
                },
                RegionInfo {
                    identifier: None,
                    url: "/x".into(),
                    only: None,
                    debounce: Some("50".into()),
                },
            ]
        );
    }

    #[test]
    fn test_run_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, r#"<updates-for identifier="a"></updates-for>"#).unwrap();

        assert!(run(&LiveConfig::default(), &path).is_ok());
        assert!(run(&LiveConfig::default(), &dir.path().join("missing.html")).is_err());
    }
}
