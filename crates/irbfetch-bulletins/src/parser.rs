//! Listing page parsing: bulletin links and pagination
//!
//! Bulletin anchors look like `<a href="/pub/irs-irbs/irb24-01.pdf">`; the
//! pager is a `<ul class="pagination">` whose next item carries
//! `pager__item--next`.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::state::DocumentLink;

/// Path shape of a bulletin PDF
const DOCUMENT_PATTERN: &str = r"/pub/irs-irbs/irb\d+-\d+\.pdf";

/// Links and pagination state extracted from one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Bulletin links in document order, unique by filename within the page
    pub links: Vec<DocumentLink>,
    pub has_next: bool,
}

pub struct PageParser {
    origin: Url,
    document: Regex,
    anchor_with_href: Selector,
    anchor: Selector,
    pagination: Selector,
    next_item: Selector,
}

impl PageParser {
    /// Parser resolving relative links against `site_origin`.
    pub fn new(site_origin: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            origin: Url::parse(site_origin)?,
            document: Regex::new(DOCUMENT_PATTERN).expect("valid document pattern"),
            anchor_with_href: Selector::parse("a[href]").expect("valid selector"),
            anchor: Selector::parse("a").expect("valid selector"),
            pagination: Selector::parse("ul.pagination").expect("valid selector"),
            next_item: Selector::parse("li.pager__item--next").expect("valid selector"),
        })
    }

    /// Parse a listing page once for both links and pagination.
    pub fn parse(&self, html: &str) -> ListingPage {
        let doc = Html::parse_document(html);
        ListingPage {
            links: self.links_in(&doc),
            has_next: self.next_in(&doc),
        }
    }

    pub fn extract_links(&self, html: &str) -> Vec<DocumentLink> {
        self.links_in(&Html::parse_document(html))
    }

    pub fn has_next_page(&self, html: &str) -> bool {
        self.next_in(&Html::parse_document(html))
    }

    fn links_in(&self, doc: &Html) -> Vec<DocumentLink> {
        let mut links: Vec<DocumentLink> = Vec::new();
        for a in doc.select(&self.anchor_with_href) {
            let Some(href) = a.value().attr("href") else {
                continue;
            };
            if !self.document.is_match(href) {
                continue;
            }
            let Some(link) = self.resolve(href) else {
                log::debug!("Ignoring unresolvable link: {href}");
                continue;
            };
            if !links.iter().any(|l| l.filename == link.filename) {
                links.push(link);
            }
        }
        links
    }

    /// Absolute URL and final path segment for a bulletin href
    fn resolve(&self, href: &str) -> Option<DocumentLink> {
        let url = self.origin.join(href).ok()?;
        let filename = url.path_segments()?.next_back()?.to_string();
        if filename.is_empty() {
            return None;
        }
        Some(DocumentLink::new(filename, url.as_str()))
    }

    /// Missing or malformed pagination means there is no next page.
    fn next_in(&self, doc: &Html) -> bool {
        let Some(pagination) = doc.select(&self.pagination).next() else {
            return false;
        };

        let marked_next = pagination.select(&self.next_item).any(|li| {
            li.select(&self.anchor)
                .next()
                .is_some_and(|a| says_next(&a))
        });
        if marked_next {
            return true;
        }

        pagination.select(&self.anchor).any(|a| says_next(&a))
    }
}

fn says_next(anchor: &ElementRef<'_>) -> bool {
    anchor.text().collect::<String>().contains("Next")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://www.irs.gov";

    fn parser() -> PageParser {
        PageParser::new(ORIGIN).unwrap()
    }

    const LISTING: &str = r#"
<html><body>
<table>
  <tr><td><a href="/pub/irs-irbs/irb24-52.pdf">Internal Revenue Bulletin: 2024-52</a></td></tr>
  <tr><td><a href="/irb/2024-52_IRB">HTML version</a></td></tr>
  <tr><td><a href="https://www.irs.gov/pub/irs-irbs/irb24-51.pdf">2024-51</a></td></tr>
  <tr><td><a href="/pub/irs-irbs/irb24-52.pdf">PDF again</a></td></tr>
  <tr><td><a href="/pub/irs-pdf/p15.pdf">Publication 15</a></td></tr>
</table>
<nav>
<ul class="pagination js-pager__items">
  <li class="pager__item is-active"><a href="?page=0">1</a></li>
  <li class="pager__item"><a href="?page=1">2</a></li>
  <li class="pager__item pager__item--next"><a href="?page=1" rel="next"><span>Next page</span><span>Next ›</span></a></li>
</ul>
</nav>
</body></html>"#;

    #[test]
    fn extracts_matching_links_in_order() {
        let links = parser().extract_links(LISTING);
        assert_eq!(
            links,
            vec![
                DocumentLink::new(
                    "irb24-52.pdf",
                    "https://www.irs.gov/pub/irs-irbs/irb24-52.pdf"
                ),
                DocumentLink::new(
                    "irb24-51.pdf",
                    "https://www.irs.gov/pub/irs-irbs/irb24-51.pdf"
                ),
            ]
        );
    }

    #[test]
    fn relative_links_resolve_against_origin() {
        let parser = PageParser::new("http://127.0.0.1:8080").unwrap();
        let links = parser.extract_links(r#"<a href="/pub/irs-irbs/irb03-10.pdf">x</a>"#);
        assert_eq!(links[0].url, "http://127.0.0.1:8080/pub/irs-irbs/irb03-10.pdf");
        assert_eq!(links[0].filename, "irb03-10.pdf");
    }

    #[test]
    fn ignores_non_bulletin_pdfs() {
        let html = r#"<a href="/pub/irs-pdf/f1040.pdf">1040</a><a href="/pub/irs-irbs/irbXX-1.pdf">bad</a>"#;
        assert!(parser().extract_links(html).is_empty());
    }

    #[test]
    fn next_item_detected() {
        assert!(parser().has_next_page(LISTING));
    }

    #[test]
    fn falls_back_to_any_next_anchor() {
        let html = r#"<ul class="pagination"><li><a href="?page=4">Next ›</a></li></ul>"#;
        assert!(parser().has_next_page(html));
    }

    #[test]
    fn no_pagination_means_last_page() {
        let html = r#"<a href="?page=2">Next</a>"#;
        assert!(!parser().has_next_page(html));
    }

    #[test]
    fn pagination_without_next_means_last_page() {
        let html = r#"
<ul class="pagination">
  <li class="pager__item pager__item--previous"><a href="?page=2">‹ Previous</a></li>
  <li class="pager__item is-active"><a href="?page=3">4</a></li>
</ul>"#;
        assert!(!parser().has_next_page(html));
    }

    #[test]
    fn parse_combines_both() {
        let page = parser().parse(LISTING);
        assert_eq!(page.links.len(), 2);
        assert!(page.has_next);
    }

    #[test]
    fn invalid_origin_rejected() {
        assert!(PageParser::new("not a url").is_err());
    }
}
