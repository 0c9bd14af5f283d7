//! `mirror` command: keep an HTML file's live regions in sync.
//!
//! ```text
//! updates-for.toml ─► Page(document, HttpFetcher) ─► Coordinator per region ◄── CableTransport
//!                                     │
//!                               after-update ─► write file ─► status line
//! ```

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use url::Url;

use crate::config::LiveConfig;
use crate::diagnostics::PassLog;
use crate::dom::{Document, NodeId};
use crate::fetch::HttpFetcher;
use crate::live::{Connection, Page, UpdateEvent};
use crate::logger::{status_error, status_success, status_warning};
use crate::transport::{CableTransport, Transport};

/// How often the mirror checks whether every subscription ended.
const LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

pub fn run(config: &LiveConfig, path: &Path) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;

    let page = Arc::new(build_page(config, path)?);
    let transport = connect_cable(config)?;

    runtime.block_on(async {
        let mirror = Mirror::start(page, path, transport.as_ref().map(|t| t as &dyn Transport)).await?;
        mirror
            .run_until(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
    })
}

/// Open the configured cable. Blocking: call it outside the runtime.
fn connect_cable(config: &LiveConfig) -> Result<Option<CableTransport>> {
    let Some(url) = &config.cable.url else {
        return Ok(None);
    };
    let transport = CableTransport::connect(url, config.cable.origin.as_deref())
        .with_context(|| format!("cannot connect to {url}"))?;
    Ok(Some(transport))
}

fn build_page(config: &LiveConfig, path: &Path) -> Result<Page> {
    let html = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let location = config
        .fetch
        .location
        .clone()
        .context("mirror needs the document location: pass --location or set [fetch].location")?;
    let base = Url::parse(&location).with_context(|| format!("invalid location `{location}`"))?;

    let fetcher = HttpFetcher::default()
        .with_base(base)
        .with_headers(config.fetch.headers.clone());
    let log = if config.log.record {
        PassLog::recording()
    } else {
        PassLog::new()
    };

    Ok(Page::new(Document::parse(&html), location, Arc::new(fetcher))
        .with_settings(config.settings())
        .with_log(log))
}

/// A page whose regions are connected, written back to `path` after every
/// region patch.
pub struct Mirror {
    page: Arc<Page>,
    path: PathBuf,
    patched: mpsc::UnboundedReceiver<NodeId>,
    connections: Vec<Connection>,
}

impl Mirror {
    pub async fn start(page: Arc<Page>, path: &Path, transport: Option<&dyn Transport>) -> Result<Self> {
        let (tx, patched) = mpsc::unbounded_channel();
        page.on_update(Box::new(move |event, operation, _| {
            if event == UpdateEvent::AfterUpdate {
                let _ = tx.send(operation.element);
            }
        }));

        let connections = page.connect_all(transport).await;
        if connections.is_empty() {
            bail!("no live region connected in {}", path.display());
        }
        crate::log!("mirror"; "watching {} region(s) in {}", connections.len(), path.display());

        Ok(Self {
            page,
            path: path.to_path_buf(),
            patched,
            connections,
        })
    }

    /// Write patches until `shutdown` resolves or every subscription ends.
    pub async fn run_until<F: Future<Output = ()>>(mut self, shutdown: F) -> Result<()> {
        tokio::pin!(shutdown);
        let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                patched = self.patched.recv() => match patched {
                    Some(element) => self.write(element),
                    None => break,
                },
                _ = liveness.tick() => {
                    if self.connections.iter().all(Connection::is_finished) {
                        status_warning("every subscription closed, stopping");
                        break;
                    }
                }
            }
        }
        crate::log!("mirror"; "stopped");
        Ok(())
    }

    fn write(&self, element: NodeId) {
        let (html, identifier) = {
            let document = self.page.document();
            let identifier = document.attr(element, "identifier").unwrap_or_default().to_string();
            (document.to_html(), identifier)
        };
        match fs::write(&self.path, html) {
            Ok(()) => status_success(&format!("patched {identifier}")),
            Err(e) => status_error(&format!("cannot write {}", self.path.display()), &e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use crate::transport::{ChannelTransport, Notification};

    #[tokio::test]
    async fn test_mirror_writes_patched_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        let html = r#"<main><updates-for identifier="todos" url="/todos"><p>old</p></updates-for></main>"#;
        fs::write(&path, html).unwrap();

        let fetcher = MockFetcher::new().route("/todos", r#"<updates-for identifier="todos"><p>new</p></updates-for>"#);
        let page = Arc::new(Page::new(Document::parse(html), "http://app.test/", Arc::new(fetcher)));
        let hub = ChannelTransport::new();

        let mirror = Mirror::start(page, &path, Some(&hub)).await.unwrap();
        hub.broadcast(Notification::new("todos"));
        mirror
            .run_until(tokio::time::sleep(Duration::from_millis(300)))
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            r#"<main><updates-for identifier="todos" url="/todos"><p>new</p></updates-for></main>"#
        );
    }

    #[tokio::test]
    async fn test_mirror_keeps_doctype_and_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        let html = concat!(
            "<!DOCTYPE html>\n",
            r#"<html><head></head><body><h1>Todos</h1> <updates-for identifier="todos" url="/todos"><p>old</p></updates-for></body></html>"#,
        );
        fs::write(&path, html).unwrap();

        let fetcher = MockFetcher::new().route(
            "/todos",
            r#"<updates-for identifier="todos"><p><b>Buy</b> <i>milk</i></p></updates-for>"#,
        );
        let page = Arc::new(Page::new(Document::parse(html), "http://app.test/", Arc::new(fetcher)));
        let hub = ChannelTransport::new();

        let mirror = Mirror::start(page, &path, Some(&hub)).await.unwrap();
        hub.broadcast(Notification::new("todos"));
        mirror
            .run_until(tokio::time::sleep(Duration::from_millis(300)))
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            concat!(
                "<!DOCTYPE html>\n",
                r#"<html><head></head><body><h1>Todos</h1> <updates-for identifier="todos" url="/todos"><p><b>Buy</b> <i>milk</i></p></updates-for></body></html>"#,
            )
        );
    }

    #[test]
    fn test_connect_cable_outside_runtime() {
        assert!(connect_cable(&LiveConfig::default()).unwrap().is_none());

        let mut config = LiveConfig::default();
        config.cable.url = Some("ws://127.0.0.1:1/cable".into());
        assert!(connect_cable(&config).is_err());
    }

    #[tokio::test]
    async fn test_mirror_without_transport_fails() {
        let page = Arc::new(Page::new(
            Document::parse(r#"<updates-for identifier="a"></updates-for>"#),
            "http://app.test/",
            Arc::new(MockFetcher::new()),
        ));
        assert!(Mirror::start(page, Path::new("page.html"), None).await.is_err());
    }

    #[test]
    fn test_build_page_needs_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<updates-for identifier=\"a\"></updates-for>").unwrap();

        assert!(build_page(&LiveConfig::default(), &path).is_err());

        let mut config = LiveConfig::default();
        config.fetch.location = Some("http://app.test/boards/1".into());
        let page = build_page(&config, &path).unwrap();
        assert_eq!(page.location(), "http://app.test/boards/1");
        assert_eq!(page.regions().len(), 1);
    }
}
