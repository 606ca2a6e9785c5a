//! Scripted in-memory browser for exercising adapters and the pipeline.

use crate::browser::{
    Browser, BrowserError, BrowserLauncher, ClickAction, ElementHandle, ElementSnapshot,
    HandleRegistry, Page,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    pub redirect: Option<String>,
    pub elements: HashMap<String, Option<String>>,
    pub links: HashMap<String, String>,
    pub rows: HashMap<String, Vec<Vec<String>>>,
}

impl FakeDocument {
    pub fn text(mut self, locator: &str, text: &str) -> Self {
        self.elements
            .insert(locator.to_string(), Some(text.to_string()));
        self
    }

    pub fn null_text(mut self, locator: &str) -> Self {
        self.elements.insert(locator.to_string(), None);
        self
    }

    pub fn link(mut self, locator: &str, target: &str) -> Self {
        self.elements.insert(locator.to_string(), Some(String::new()));
        self.links.insert(locator.to_string(), target.to_string());
        self
    }

    pub fn redirect_to(mut self, url: &str) -> Self {
        self.redirect = Some(url.to_string());
        self
    }

    pub fn rows(mut self, locator: &str, rows: Vec<Vec<&str>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        self.rows.insert(locator.to_string(), rows);
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeStats {
    pub launched: AtomicUsize,
    pub browsers_closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub clicks: AtomicUsize,
}

impl FakeStats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    pub docs: Arc<HashMap<String, FakeDocument>>,
    pub delay: Duration,
    pub stats: Arc<FakeStats>,
}

impl FakeLauncher {
    pub fn new<S: Into<String>>(docs: Vec<(S, FakeDocument)>) -> Self {
        Self {
            docs: Arc::new(
                docs.into_iter()
                    .map(|(url, doc)| (url.into(), doc))
                    .collect(),
            ),
            delay: Duration::ZERO,
            stats: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, BrowserError> {
        self.stats.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser {
            docs: Arc::clone(&self.docs),
            delay: self.delay,
            stats: Arc::clone(&self.stats),
        }))
    }
}

#[derive(Debug)]
pub struct FakeBrowser {
    docs: Arc<HashMap<String, FakeDocument>>,
    delay: Duration,
    stats: Arc<FakeStats>,
}

impl FakeBrowser {
    pub fn new(launcher: &FakeLauncher) -> Self {
        Self {
            docs: Arc::clone(&launcher.docs),
            delay: launcher.delay,
            stats: Arc::clone(&launcher.stats),
        }
    }
}

#[async_trait::async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        self.stats.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            docs: Arc::clone(&self.docs),
            delay: self.delay,
            stats: Arc::clone(&self.stats),
            handles: HandleRegistry::new(),
            current: Mutex::new(None),
            fail_reads: false,
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.stats.browsers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakePage {
    docs: Arc<HashMap<String, FakeDocument>>,
    delay: Duration,
    pub stats: Arc<FakeStats>,
    pub handles: Arc<HandleRegistry>,
    current: Mutex<Option<String>>,
    fail_reads: bool,
}

impl FakePage {
    pub fn at<S: Into<String>>(docs: Vec<(S, FakeDocument)>, url: &str) -> Self {
        let launcher = FakeLauncher::new(docs);
        Self {
            docs: Arc::clone(&launcher.docs),
            delay: Duration::ZERO,
            stats: Arc::clone(&launcher.stats),
            handles: HandleRegistry::new(),
            current: Mutex::new(Some(url.to_string())),
            fail_reads: false,
        }
    }

    /// Elements still resolve, but reading their text fails.
    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    fn location(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn document(&self) -> Option<&FakeDocument> {
        self.location().and_then(|url| self.docs.get(&url))
    }

    /// Unknown URLs land on an empty document, like a browser showing an error page.
    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let landed = self
            .docs
            .get(url)
            .and_then(|doc| doc.redirect.clone())
            .unwrap_or_else(|| url.to_string());
        self.handles.clear();
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = Some(landed);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.navigate(url)
    }

    async fn set_javascript_enabled(&self, _enabled: bool) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn wait_for_element(
        &self,
        locator: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        let found = self.document().and_then(|doc| {
            doc.elements.get(locator).map(|text| ElementSnapshot {
                text: text.clone(),
                action: doc.links.get(locator).map(|href| ClickAction::Follow {
                    href: href.clone(),
                }),
            })
        });

        match found {
            Some(snapshot) => Ok(self.handles.register(snapshot)),
            None => Err(BrowserError::Timeout {
                locator: locator.to_string(),
                timeout,
            }),
        }
    }

    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>, BrowserError> {
        if self.fail_reads {
            return Err(BrowserError::StaleElement);
        }
        self.handles
            .snapshot(element)
            .map(|s| s.text)
            .ok_or(BrowserError::StaleElement)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.stats.clicks.fetch_add(1, Ordering::SeqCst);
        match self.handles.snapshot(element).and_then(|s| s.action) {
            Some(ClickAction::Follow { href }) => self.navigate(&href),
            Some(ClickAction::Submit { action, .. }) => self.navigate(&action),
            None => Err(BrowserError::Unsupported("click target has no action")),
        }
    }

    async fn query_rows(&self, row_locator: &str) -> Result<Vec<Vec<String>>, BrowserError> {
        Ok(self
            .document()
            .and_then(|doc| doc.rows.get(row_locator).cloned())
            .unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self
            .location()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        self.handles.clear();
        Ok(())
    }
}

/// One request seen by [`serve`].
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub target: String,
    pub host: String,
    pub body: String,
}

pub enum Reply {
    Page { status: u16, body: String },
    Redirect(String),
    /// Accepts the request and never answers.
    Stall,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Page {
            status: 200,
            body: body.into(),
        }
    }
}

/// Minimal HTTP/1.1 server on a random local port; one request per connection.
pub async fn serve<F>(handler: F) -> SocketAddr
where
    F: Fn(&SeenRequest) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let _ = answer(stream, handler.as_ref()).await;
            });
        }
    });
    addr
}

async fn answer<F>(mut stream: TcpStream, handler: &F) -> std::io::Result<()>
where
    F: Fn(&SeenRequest) -> Reply,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_len = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_len]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let mut host = String::new();
    let mut content_length = 0;
    for (name, value) in lines.filter_map(|l| l.split_once(':')) {
        if name.eq_ignore_ascii_case("host") {
            host = value.trim().to_string();
        } else if name.eq_ignore_ascii_case("content-length") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    while buf.len() < head_len + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(head_len + content_length);
    let body = String::from_utf8_lossy(&buf[head_len..end]).into_owned();

    let request = SeenRequest {
        method,
        target,
        host,
        body,
    };
    let (status, location, body) = match handler(&request) {
        Reply::Stall => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            return Ok(());
        }
        Reply::Page { status, body } => (status, String::new(), body),
        Reply::Redirect(to) => (302, format!("Location: {to}\r\n"), String::new()),
    };

    let response = format!(
        "HTTP/1.1 {status} Status\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n{location}\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
