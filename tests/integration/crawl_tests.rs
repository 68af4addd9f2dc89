//! Integration tests for the download engine
//!
//! Most tests drive the scheduler with a scripted plugin that never touches
//! the network. The last test runs the vBulletin plugin end-to-end against a
//! wiremock server.

use async_trait::async_trait;
use site_downloader::config::Config;
use site_downloader::crawler::{run_download, BoundItem, Coordinator, TaskContext, WorkItem};
use site_downloader::plugin::{default_registry, Plugin, PluginRegistry, Processed};
use site_downloader::{DownloadError, TaskError, TaskResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// What the scripted plugin does for one URL
#[derive(Clone)]
enum Step {
    /// Return these URLs as page items
    Discover(Vec<&'static str>),
    /// Save the page at this path instead of the item's own path
    SaveAs(&'static str),
    /// Fail with this error
    Fail(TaskError),
    /// Return content without a save path
    Broken,
}

/// Plugin whose behaviour per URL is set up by the test
struct ScriptedPlugin {
    name: &'static str,
    relevance: u8,
    steps: HashMap<&'static str, Step>,
    delay: Duration,
    log: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedPlugin {
    fn new(name: &'static str, relevance: u8) -> Self {
        Self {
            name,
            relevance,
            steps: HashMap::new(),
            delay: Duration::ZERO,
            log: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn step(mut self, url: &'static str, step: Step) -> Self {
        self.steps.insert(url, step);
        self
    }

    fn pages(&self, urls: &[&str]) -> Vec<WorkItem> {
        urls.iter()
            .map(|url| {
                let name = url.rsplit('/').next().unwrap_or("page");
                BoundItem::page(self.name, *url, name).into()
            })
            .collect()
    }

    fn processed(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Plugin for ScriptedPlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn relevance(&self, _url: &str) -> u8 {
        self.relevance
    }

    async fn process_seed(&self, url: &str, _ctx: &TaskContext) -> TaskResult<Vec<WorkItem>> {
        self.log.lock().unwrap().push(url.to_string());
        match self.steps.get(url) {
            Some(Step::Discover(urls)) => Ok(self.pages(urls)),
            Some(Step::Fail(err)) => Err(err.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn process_item(&self, item: &BoundItem, _ctx: &TaskContext) -> TaskResult<Processed> {
        self.log.lock().unwrap().push(item.url.clone());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        let content = format!("<p>{}</p>", item.url);
        match self.steps.get(item.url.as_str()) {
            Some(Step::Discover(urls)) => Ok(Processed::discovered(self.pages(urls))),
            Some(Step::SaveAs(path)) => Ok(Processed::with_content(vec![], content, *path)),
            Some(Step::Fail(err)) => Err(err.clone()),
            Some(Step::Broken) => Ok(Processed {
                discovered: vec![],
                content: Some(content),
                save_path: None,
            }),
            None => Ok(Processed::with_content(vec![], content, &item.save_path)),
        }
    }
}

/// Creates a configuration for tests
fn create_test_config(single_thread: bool, max_workers: usize) -> Config {
    let mut config = Config::default();
    config.downloader.single_thread = single_thread;
    config.downloader.max_workers = max_workers;
    config.downloader.user_agent = "TestAgent/1.0".to_string();
    config
}

fn registry_with(plugin: &Arc<ScriptedPlugin>) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register_arc(plugin.clone()).unwrap();
    registry
}

#[test]
fn test_relevance_tie_goes_to_first_registered() {
    let mut registry = PluginRegistry::new();
    registry.register(ScriptedPlugin::new("first", 50)).unwrap();
    registry.register(ScriptedPlugin::new("second", 50)).unwrap();
    registry.register(ScriptedPlugin::new("zero", 0)).unwrap();

    let selected = registry.select("http://test.local/").unwrap();
    assert_eq!(selected.name(), "first");
}

#[test]
fn test_duplicate_plugin_names_rejected() {
    let mut registry = PluginRegistry::new();
    registry.register(ScriptedPlugin::new("same", 1)).unwrap();
    assert!(registry.register(ScriptedPlugin::new("same", 2)).is_err());
}

#[tokio::test]
async fn test_sequential_run_is_depth_first() {
    let plugin = Arc::new(
        ScriptedPlugin::new("scripted", 10)
            .step("http://test.local/A", Step::Discover(vec!["http://test.local/C", "http://test.local/D"])),
    );
    let dir = TempDir::new().unwrap();

    let mut coordinator =
        Coordinator::new(&create_test_config(true, 1), dir.path(), registry_with(&plugin)).unwrap();
    coordinator.add_seeds(["http://test.local/A", "http://test.local/B"]);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(
        plugin.processed(),
        [
            "http://test.local/A",
            "http://test.local/C",
            "http://test.local/D",
            "http://test.local/B",
        ]
    );
    assert_eq!(summary.dispatched, 4);
    assert_eq!(summary.succeeded, 4);
    assert!(dir.path().join("C").exists());
    assert!(dir.path().join("D").exists());
}

#[tokio::test]
async fn test_bounded_run_drains_every_item() {
    const PAGES: [&str; 12] = [
        "http://test.local/p0",
        "http://test.local/p1",
        "http://test.local/p2",
        "http://test.local/p3",
        "http://test.local/p4",
        "http://test.local/p5",
        "http://test.local/p6",
        "http://test.local/p7",
        "http://test.local/p8",
        "http://test.local/p9",
        "http://test.local/p10",
        "http://test.local/p11",
    ];
    let mut plugin = ScriptedPlugin::new("scripted", 10)
        .step("http://test.local/root", Step::Discover(PAGES.to_vec()));
    plugin.delay = Duration::from_millis(30);
    let plugin = Arc::new(plugin);
    let dir = TempDir::new().unwrap();

    let mut coordinator =
        Coordinator::new(&create_test_config(false, 3), dir.path(), registry_with(&plugin)).unwrap();
    coordinator.add_seeds(["http://test.local/root"]);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.dispatched, 13);
    assert_eq!(summary.completed(), 13);
    assert_eq!(summary.succeeded, 13);
    assert_eq!(summary.failed, 0);
    assert_eq!(plugin.active.load(Ordering::SeqCst), 0);

    let peak = plugin.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "ran {} tasks at once", peak);
    assert!(peak > 1, "tasks never overlapped");

    for page in PAGES {
        let name = page.rsplit('/').next().unwrap();
        assert!(dir.path().join(name).exists(), "{} was not saved", name);
    }
}

#[tokio::test]
async fn test_save_path_collision_is_not_fatal() {
    let plugin = Arc::new(
        ScriptedPlugin::new("scripted", 10)
            .step("http://test.local/X", Step::Discover(vec!["http://test.local/x1"]))
            .step("http://test.local/Y", Step::Discover(vec!["http://test.local/y1"]))
            .step("http://test.local/x1", Step::SaveAs("shared/page.html"))
            .step("http://test.local/y1", Step::SaveAs("shared/page.html")),
    );
    let dir = TempDir::new().unwrap();

    let mut coordinator =
        Coordinator::new(&create_test_config(true, 1), dir.path(), registry_with(&plugin)).unwrap();
    coordinator.add_seeds(["http://test.local/X", "http://test.local/Y"]);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("shared/page.html")).unwrap(),
        "<p>http://test.local/x1</p>"
    );
}

#[tokio::test]
async fn test_item_failures_do_not_stop_the_run() {
    let plugin = Arc::new(
        ScriptedPlugin::new("scripted", 10)
            .step(
                "http://test.local/S",
                Step::Discover(vec![
                    "http://test.local/ok1",
                    "http://test.local/bad",
                    "http://test.local/ok2",
                ]),
            )
            .step(
                "http://test.local/bad",
                Step::Fail(TaskError::HttpRequest("boom".to_string())),
            ),
    );
    let dir = TempDir::new().unwrap();

    let mut coordinator =
        Coordinator::new(&create_test_config(false, 2), dir.path(), registry_with(&plugin)).unwrap();
    coordinator.add_seeds(["http://test.local/S"]);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures.failed_pages(), ["http://test.local/bad"]);
    assert!(dir.path().join("ok2").exists());
}

#[tokio::test]
async fn test_seed_without_plugin_is_reported() {
    let plugin = Arc::new(ScriptedPlugin::new("picky", 0));
    let dir = TempDir::new().unwrap();

    let mut coordinator =
        Coordinator::new(&create_test_config(true, 1), dir.path(), registry_with(&plugin)).unwrap();
    coordinator.add_seeds(["http://test.local/unknown"]);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(
        summary.failures.count(site_downloader::ErrorKind::PageDetails),
        1
    );
    assert!(plugin.processed().is_empty());
}

#[tokio::test]
async fn test_logic_error_ends_the_run() {
    let plugin = Arc::new(
        ScriptedPlugin::new("scripted", 10)
            .step("http://test.local/S", Step::Discover(vec!["http://test.local/broken"]))
            .step("http://test.local/broken", Step::Broken),
    );
    let dir = TempDir::new().unwrap();

    let mut coordinator =
        Coordinator::new(&create_test_config(false, 4), dir.path(), registry_with(&plugin)).unwrap();
    coordinator.add_seeds(["http://test.local/S"]);
    let result = coordinator.run().await;

    match result {
        Err(DownloadError::Logic { url, .. }) => assert_eq!(url, "http://test.local/broken"),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("run should have failed"),
    }
}

#[tokio::test]
async fn test_setup_errors_come_before_network() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(false, 2);

    let result = run_download(
        &config,
        &dir.path().join("missing-root"),
        &dir.path().join("urls.txt"),
        default_registry(&config).unwrap(),
    )
    .await;
    assert!(matches!(result, Err(DownloadError::Setup(_))));

    let result = run_download(
        &config,
        dir.path(),
        &dir.path().join("urls.txt"),
        default_registry(&config).unwrap(),
    )
    .await;
    assert!(matches!(result, Err(DownloadError::Setup(_))));
}

/// Matches requests by their exact query string
struct QueryIs(String);

impl Match for QueryIs {
    fn matches(&self, request: &Request) -> bool {
        request.url.query() == Some(self.0.as_str())
    }
}

fn thread_page(pager: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            r##"<html><head><base href="http://forum.invalid/" /></head><body>
            <a class="popupctrl" href="#">{}</a>
            {}
            </body></html>"##,
            pager, body
        ),
        "text/html; charset=utf-8",
    )
}

#[tokio::test]
async fn test_vbulletin_thread_download() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(QueryIs("1234-Test-Thread".to_string()))
        .respond_with(thread_page("Page 1 of 2", ""))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(QueryIs("1234-Test-Thread/page1".to_string()))
        .respond_with(thread_page(
            "Page 1 of 2",
            r#"<img src="/images/logo.png" /><div style="background-image:url(/images/bg.jpg)">x</div>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(QueryIs("1234-Test-Thread/page2".to_string()))
        .respond_with(thread_page("Page 2 of 2", r#"<img src="/images/smile.gif" />"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    for (file, content_type) in [
        ("/images/logo.png", "image/png"),
        ("/images/bg.jpg", "image/jpeg"),
        ("/images/smile.gif", "image/gif"),
    ] {
        Mock::given(method("GET"))
            .and(path(file))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(file.as_bytes().to_vec())
                    .insert_header("content-type", content_type),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let root = TempDir::new().unwrap();
    let url_file = root.path().join("urls.txt");
    std::fs::write(
        &url_file,
        format!("{}/showthread.php?1234-Test-Thread\n\n", mock_server.uri()),
    )
    .unwrap();

    let config = create_test_config(false, 4);
    let summary = run_download(
        &config,
        root.path(),
        &url_file,
        default_registry(&config).unwrap(),
    )
    .await
    .expect("Download should succeed");

    assert_eq!(summary.dispatched, 6);
    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.failed, 0);

    let page1 = std::fs::read_to_string(root.path().join("1234-Test-Thread-1.html")).unwrap();
    assert!(page1.contains(r#"src="1234-Test-Thread-1_files/logo.png""#));
    assert!(page1.contains("url(1234-Test-Thread-1_files/bg.jpg)"));
    assert!(page1.contains(r#"href=".""#));
    assert!(root.path().join("1234-Test-Thread-2.html").exists());

    assert_eq!(
        std::fs::read(root.path().join("1234-Test-Thread-1_files/logo.png")).unwrap(),
        b"/images/logo.png"
    );
    assert!(root
        .path()
        .join("1234-Test-Thread-1_files/bg.jpg")
        .exists());
    assert!(root
        .path()
        .join("1234-Test-Thread-2_files/smile.gif")
        .exists());
}
