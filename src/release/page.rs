//! Reads release timestamps from the patch page.
//!
//! The patch page is a plain directory listing. Each file is a table row whose
//! first cell holds the link and whose next cell holds the publication time:
//!
//! ```html
//! <tr><td><a href="App_Patch.zip">App_Patch.zip</a></td><td>2024-06-01 10:00</td>...</tr>
//! ```

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::core::{PatchError, Timestamp};
use crate::release::ReleaseSource;
use crate::utils::http::build_client;

/// [`ReleaseSource`] backed by an HTTP directory listing.
#[derive(Debug, Clone)]
pub struct PatchPage {
    client: reqwest::Client,
}

impl PatchPage {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
        })
    }

    pub const fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
        }
    }
}

impl ReleaseSource for PatchPage {
    async fn published_at(&self, page_url: &str, archive_name: &str) -> Result<Timestamp> {
        debug!("Fetching patch page {}", page_url);

        let html = self
            .client
            .get(page_url)
            .send()
            .await
            .map_err(|e| PatchError::network("patch page request", e))?
            .error_for_status()
            .map_err(|e| PatchError::network("patch page request", e))?
            .text()
            .await
            .map_err(|e| PatchError::network("patch page read", e))?;

        debug!("Patch page is {} bytes", html.len());

        let raw = listing_text_for(&html, archive_name)?.ok_or_else(|| {
            PatchError::ReleaseNotListed {
                archive: archive_name.to_string(),
                url: page_url.to_string(),
            }
        })?;

        Ok(Timestamp::parse_listing(&raw)?)
    }
}

/// Text of the element that follows the link's container, or `None` when no
/// link to `archive_name` exists.
///
/// Separate from the HTTP call so it can be tested against fixture HTML.
pub(crate) fn listing_text_for(html: &str, archive_name: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let escaped = archive_name.replace('\\', "\\\\").replace('"', "\\\"");
    let selector = Selector::parse(&format!("a[href=\"{escaped}\"]")).map_err(|e| {
        PatchError::Other {
            message: format!("invalid archive selector for '{archive_name}': {e:?}"),
        }
    })?;

    let Some(anchor) = document.select(&selector).next() else {
        return Ok(None);
    };

    let text = anchor
        .parent()
        .and_then(|container| container.next_siblings().find_map(ElementRef::wrap))
        .map(|cell| cell.text().collect::<String>())
        .unwrap_or_default();

    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<!DOCTYPE html>
<html>
<body>
<table>
  <tr><th>Name</th><th>Last modified</th><th>Size</th></tr>
  <tr>
    <td><a href="App_Old.zip">App_Old.zip</a></td>
    <td align="right">2023-01-05 08:30  </td>
    <td>1.2M</td>
  </tr>
  <tr>
    <td><a href="App_Patch.zip">App_Patch.zip</a></td>
    <td align="right"> 2024-06-01 10:00 </td>
    <td>12M</td>
  </tr>
  <tr>
    <td><a href="Broken.zip">Broken.zip</a></td>
    <td>soon</td>
  </tr>
</table>
</body>
</html>"#;

    #[test]
    fn test_finds_cell_after_link() {
        let text = listing_text_for(LISTING, "App_Patch.zip").unwrap().unwrap();
        assert_eq!(text.trim(), "2024-06-01 10:00");
        assert_eq!(
            Timestamp::parse_listing(&text).unwrap(),
            Timestamp::parse_listing("2024-06-01 10:00").unwrap()
        );
    }

    #[test]
    fn test_exact_href_match_only() {
        assert!(listing_text_for(LISTING, "App_Patch").unwrap().is_none());
        assert!(listing_text_for(LISTING, "Missing.zip").unwrap().is_none());
    }

    #[test]
    fn test_unparseable_cell_is_returned_verbatim() {
        let text = listing_text_for(LISTING, "Broken.zip").unwrap().unwrap();
        assert_eq!(text, "soon");
        assert!(Timestamp::parse_listing(&text).is_err());
    }

    #[test]
    fn test_quotes_in_name_do_not_break_selector() {
        assert!(listing_text_for(LISTING, "we\"ird.zip").unwrap().is_none());
    }
}
