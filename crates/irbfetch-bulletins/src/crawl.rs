//! Sequential crawl of the listing pages
//!
//! Pages are fetched one at a time with a politeness delay between them.
//! The crawl ends at the first of: a page that cannot be fetched, a page
//! that adds no new links, a page without a next control, the page cap, or
//! a shutdown request. Ending is never an error; whatever was collected so
//! far is returned.

use std::collections::HashSet;

use anyhow::Context;
use irbfetch_core::{FetchError, Fetcher, ProgressContext, is_shutdown_requested};

use crate::config::Config;
use crate::parser::PageParser;
use crate::state::DocumentLink;

pub struct LinkCollector<'a> {
    fetcher: &'a dyn Fetcher,
    config: &'a Config,
    progress: &'a ProgressContext,
    parser: PageParser,
}

impl<'a> LinkCollector<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        config: &'a Config,
        progress: &'a ProgressContext,
    ) -> anyhow::Result<Self> {
        let parser = PageParser::new(&config.site_origin)
            .with_context(|| format!("Invalid site origin: {}", config.site_origin))?;
        Ok(Self {
            fetcher,
            config,
            progress,
            parser,
        })
    }

    /// Crawl listing pages and return unique links in discovery order.
    pub fn collect_all_links(&self, max_pages: Option<usize>) -> Vec<DocumentLink> {
        let status = self.progress.stage_line("crawl");
        let mut collected = Vec::new();
        let mut seen = HashSet::new();
        let mut page_num = 0usize;

        while max_pages.is_none_or(|max| page_num < max) {
            if is_shutdown_requested() {
                log::warn!("Shutdown requested, stopping crawl");
                break;
            }
            if page_num > 0 && !self.config.page_delay.is_zero() {
                std::thread::sleep(self.config.page_delay);
            }

            let url = self.config.page_url(page_num);
            let label = page_num + 1;
            log::info!("Scraping page {label}: {url}");
            status.set_message(format!("page {label} ({} bulletins)", collected.len()));

            let html = match self.fetch_page(&url) {
                Ok(html) => html,
                Err(e) => {
                    log::error!("Failed to fetch page {label}: {e}");
                    break;
                }
            };

            let page = self.parser.parse(&html);
            let new_links = take_new(page.links, &mut seen);
            if new_links.is_empty() {
                log::info!("No new bulletin links on page {label}, treating it as the last page");
                break;
            }
            log::debug!("Page {label}: {} new links", new_links.len());
            collected.extend(new_links);

            if !page.has_next {
                log::info!("No 'Next' link on page {label}, reached the last page");
                break;
            }
            page_num += 1;
        }

        status.finish_and_clear();
        if collected.is_empty() {
            log::warn!("No bulletin links found");
        } else {
            log::info!("Found {} bulletins across all pages", collected.len());
        }
        collected
    }

    fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.fetcher.fetch(url, false)?.text().map_err(FetchError::Io)
    }
}

/// Keep the links whose filename is not in `seen`, recording each kept one.
pub fn take_new(links: Vec<DocumentLink>, seen: &mut HashSet<String>) -> Vec<DocumentLink> {
    links
        .into_iter()
        .filter(|link| seen.insert(link.filename.clone()))
        .collect()
}
