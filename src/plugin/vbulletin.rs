//! vBulletin forum thread downloader
//!
//! A thread seed such as `http://forum.example/showthread.php?123-title` is
//! expanded into one item per thread page. Each page is then fetched, the
//! images and stylesheets it references are queued as file downloads into a
//! `<page>_files/` directory next to it, and the page itself is saved with
//! those references pointing at the local copies.

use super::{Plugin, Processed};
use crate::config::VBulletinConfig;
use crate::crawler::{BoundItem, TaskContext, WorkItem};
use crate::url::{last_segment, usable_filename};
use crate::{TaskError, TaskResult};
use async_trait::async_trait;
use lol_html::{element, HtmlRewriter, Settings};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use url::Url;

const NAME: &str = "vBulletin";

/// Marker that identifies a thread URL
const THREAD_MARKER: &str = "/showthread.php?";

fn thread_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*)(/showthread\.php\?)(\d+-[^/]*)(/page\d+)?").expect("valid regex")
    })
}

fn pager_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Page 1 of (\d+)").expect("valid regex"))
}

fn background_image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"background-image\s*:\s*url\(\s*['"]?([^'")]*)['"]?\s*\)"#).expect("valid regex")
    })
}

/// Downloads vBulletin threads page by page
#[derive(Debug, Clone)]
pub struct VBulletinPlugin {
    download_assets: bool,
    rewrite_paths: bool,
}

impl Default for VBulletinPlugin {
    fn default() -> Self {
        Self::from_config(&VBulletinConfig::default())
    }
}

impl VBulletinPlugin {
    pub fn new(download_assets: bool, rewrite_paths: bool) -> Self {
        Self {
            download_assets,
            rewrite_paths,
        }
    }

    pub fn from_config(config: &VBulletinConfig) -> Self {
        Self::new(config.download_assets, config.rewrite_paths)
    }

    /// Builds the work item for one page of a thread
    fn page_item(&self, thread: &ThreadUrl, category: &str, page: u32) -> WorkItem {
        let name = if category.is_empty() {
            format!("{}-{}", thread.main_name, page)
        } else {
            format!("{}-{}-{}", thread.main_name, category, page)
        };

        // Without asset downloads the page is saved exactly as served.
        let (save_path, is_file) = if self.download_assets {
            (PathBuf::from(&name), false)
        } else {
            (PathBuf::from(format!("{}.html", name)), true)
        };

        WorkItem::Bound(BoundItem {
            owner: NAME.to_string(),
            category: category.to_string(),
            display_name: name,
            url: thread.page_url(page),
            save_path,
            is_file,
        })
    }
}

#[async_trait]
impl Plugin for VBulletinPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn relevance(&self, url: &str) -> u8 {
        if url.contains(THREAD_MARKER) {
            100
        } else {
            0
        }
    }

    async fn process_seed(&self, url: &str, ctx: &TaskContext) -> TaskResult<Vec<WorkItem>> {
        let thread = ThreadUrl::parse(url)?;

        let html = ctx.get_page(url, self.credentials(url).as_ref()).await?;
        let category = self.category(url, &html);

        let last_page = match find_last_page(&html) {
            Some(last_page) => last_page,
            None => {
                tracing::warn!("Couldn't find last page tag for {}", url);
                1
            }
        };
        tracing::info!("Thread {} has {} pages", thread.main_name, last_page);

        Ok((1..=last_page)
            .map(|page| self.page_item(&thread, &category, page))
            .collect())
    }

    async fn process_item(&self, item: &BoundItem, ctx: &TaskContext) -> TaskResult<Processed> {
        let html = ctx
            .get_page(&item.url, self.credentials(&item.url).as_ref())
            .await?;

        let page_url = Url::parse(&item.url)
            .map_err(|e| TaskError::PageDetails(format!("Invalid page URL {}: {}", item.url, e)))?;

        let assets = scan_page(&html, &page_url, &item.save_path, &item.category);
        tracing::debug!("Found {} assets on {}", assets.items.len(), item.url);

        let content = if self.rewrite_paths {
            rewrite_page(&html, &assets.local_paths)?
        } else {
            html
        };

        let mut save_path = item.save_path.clone().into_os_string();
        save_path.push(".html");

        Ok(Processed::with_content(
            assets.items,
            content,
            PathBuf::from(save_path),
        ))
    }
}

/// The parts of a thread URL needed to address its pages
#[derive(Debug, Clone, PartialEq, Eq)]
struct ThreadUrl {
    intro: String,
    marker: String,
    main_name: String,
}

impl ThreadUrl {
    fn parse(url: &str) -> TaskResult<Self> {
        let captures = thread_url_regex().captures(url).ok_or_else(|| {
            TaskError::PageDetails(format!("{} isn't a valid page of a thread", url))
        })?;

        let main_name = &captures[3];
        if main_name.is_empty() || usable_filename(main_name) != main_name {
            return Err(TaskError::PageDetails(format!(
                "Failed to parse thread name from {}",
                url
            )));
        }

        Ok(Self {
            intro: captures[1].to_string(),
            marker: captures[2].to_string(),
            main_name: main_name.to_string(),
        })
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}{}{}/page{}", self.intro, self.marker, self.main_name, page)
    }
}

/// Reads the page count from the "Page 1 of N" pager control
fn find_last_page(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a.popupctrl").ok()?;

    document.select(&selector).find_map(|element| {
        let text: String = element.text().collect();
        pager_regex()
            .captures(text.trim())
            .and_then(|captures| captures[1].parse::<u32>().ok())
            .filter(|&pages| pages > 0)
    })
}

/// Assets referenced by a page
#[derive(Debug, Default)]
struct PageAssets {
    /// File downloads, one per distinct absolute URL
    items: Vec<WorkItem>,

    /// Reference as written in the page (with `&amp;` decoded) → local path
    /// relative to the page
    local_paths: HashMap<String, String>,
}

impl PageAssets {
    fn add(
        &mut self,
        reference: &str,
        page_url: &Url,
        page_path: &Path,
        category: &str,
        seen: &mut HashSet<String>,
    ) {
        let reference = decode_amp(reference.trim());
        if reference.is_empty() {
            return;
        }

        let Ok(absolute) = page_url.join(&reference) else {
            tracing::debug!("Skipping unresolvable asset reference {}", reference);
            return;
        };
        if !matches!(absolute.scheme(), "http" | "https") {
            return;
        }

        let filename = usable_filename(last_segment(&reference));
        if filename.is_empty() {
            tracing::debug!("No usable filename for asset {}", absolute);
            return;
        }

        let dir_name = format!("{}_files", file_name(page_path));
        let local_path = format!("{}/{}", dir_name, filename);
        let save_path = page_path.with_file_name(&dir_name).join(&filename);

        if seen.insert(absolute.to_string()) {
            self.items.push(WorkItem::Bound(BoundItem {
                owner: NAME.to_string(),
                category: category.to_string(),
                display_name: filename,
                url: absolute.to_string(),
                save_path,
                is_file: true,
            }));
        }
        self.local_paths.insert(reference, local_path);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn decode_amp(reference: &str) -> String {
    reference.replace("&amp;", "&")
}

/// Collects images, inline background images and stylesheets from a page
fn scan_page(html: &str, page_url: &Url, page_path: &Path, category: &str) -> PageAssets {
    let document = Html::parse_document(html);
    let mut assets = PageAssets::default();
    let mut seen = HashSet::new();

    if let Ok(selector) = Selector::parse("img[src]") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                assets.add(src, page_url, page_path, category, &mut seen);
            }
        }
    }

    if let Ok(selector) = Selector::parse("[style]") {
        for element in document.select(&selector) {
            let Some(style) = element.value().attr("style") else {
                continue;
            };
            if let Some(captures) = background_image_regex().captures(style) {
                assets.add(&captures[1], page_url, page_path, category, &mut seen);
            }
        }
    }

    if let Ok(selector) = Selector::parse("link[href]") {
        for element in document.select(&selector) {
            let link = element.value();
            let is_css = link
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("text/css"))
                || link.attr("rel").is_some_and(|rel| {
                    rel.split_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                });
            if !is_css {
                continue;
            }
            if let Some(href) = link.attr("href") {
                assets.add(href, page_url, page_path, category, &mut seen);
            }
        }
    }

    assets
}

fn local_path_for<'a>(local_paths: &'a HashMap<String, String>, reference: &str) -> Option<&'a String> {
    local_paths.get(&decode_amp(reference.trim()))
}

/// Replaces the background-image URL in an inline style, if it was collected
fn rewrite_style(style: &str, local_paths: &HashMap<String, String>) -> Option<String> {
    let captures = background_image_regex().captures(style)?;
    let reference = captures.get(1)?;
    let local = local_path_for(local_paths, reference.as_str())?;

    Some(format!(
        "{}{}{}",
        &style[..reference.start()],
        local,
        &style[reference.end()..]
    ))
}

/// Points collected references at their local copies and neutralizes `<base>`
fn rewrite_page(html: &str, local_paths: &HashMap<String, String>) -> TaskResult<String> {
    let mut output = Vec::with_capacity(html.len());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                // Relative references must resolve against the saved file.
                element!("base[href]", |el| {
                    el.set_attribute("href", ".")?;
                    Ok(())
                }),
                element!("img[src]", |el| {
                    if let Some(local) = el
                        .get_attribute("src")
                        .and_then(|src| local_path_for(local_paths, &src).cloned())
                    {
                        el.set_attribute("src", &local)?;
                    }
                    Ok(())
                }),
                element!("link[href]", |el| {
                    if let Some(local) = el
                        .get_attribute("href")
                        .and_then(|href| local_path_for(local_paths, &href).cloned())
                    {
                        el.set_attribute("href", &local)?;
                    }
                    Ok(())
                }),
                element!("[style]", |el| {
                    if let Some(style) = el
                        .get_attribute("style")
                        .and_then(|style| rewrite_style(&style, local_paths))
                    {
                        el.set_attribute("style", &style)?;
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| TaskError::PageDetails(format!("HTML rewrite error: {}", e)))?;
    rewriter
        .end()
        .map_err(|e| TaskError::PageDetails(format!("HTML rewrite error: {}", e)))?;

    String::from_utf8(output)
        .map_err(|e| TaskError::PageDetails(format!("Rewritten page is not UTF-8: {}", e)))
}
