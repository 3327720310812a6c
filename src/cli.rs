use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use url::Url;

pub const MIN_THREADS: u8 = 1;
pub const MAX_THREADS: u8 = 65;
pub const DEFAULT_THREADS: u8 = 8;

/// One `<URL> <FILE>` pair from the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadItem {
    pub url: String,
    pub filename: String,
}

impl DownloadItem {
    pub fn destination(&self, dir: &Path) -> PathBuf {
        dir.join(&self.filename)
    }
}

/// Groups positional arguments into URL/file pairs.
pub fn parse_items(args: &[String]) -> Result<Vec<DownloadItem>> {
    if args.is_empty() {
        bail!("expected at least one <URL> <FILE> pair");
    }
    if args.len() % 2 != 0 {
        bail!("arguments must come in <URL> <FILE> pairs, got {} values", args.len());
    }

    args.chunks(2)
        .map(|pair| {
            let url = pair[0].trim();
            let filename = pair[1].trim();
            let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("Unsupported URL scheme '{}': {}", parsed.scheme(), url);
            }
            if filename.is_empty() {
                bail!("Empty destination file name for {}", url);
            }
            Ok(DownloadItem {
                url: url.to_string(),
                filename: filename.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pairs_are_grouped_in_order() {
        let items = parse_items(&strings(&[
            "https://example.com/a.iso",
            "a.iso",
            "http://example.com/b",
            "sub/b.bin",
        ]))
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://example.com/a.iso");
        assert_eq!(items[1].filename, "sub/b.bin");
        assert_eq!(items[1].destination(Path::new("/data")), PathBuf::from("/data/sub/b.bin"));
    }

    #[test]
    fn odd_or_empty_arguments_are_rejected() {
        assert!(parse_items(&[]).is_err());
        assert!(parse_items(&strings(&["https://example.com/a"])).is_err());
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(parse_items(&strings(&["ftp://example.com/a", "a"])).is_err());
        assert!(parse_items(&strings(&["not a url", "a"])).is_err());
        assert!(parse_items(&strings(&["https://example.com/a", " "])).is_err());
    }
}
