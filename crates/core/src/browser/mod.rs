pub mod http;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {detail}")]
    Navigation { url: String, detail: String },

    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("no element matched {locator} within {timeout:?}")]
    Timeout { locator: String, timeout: Duration },

    #[error("element handle is no longer valid")]
    StaleElement,

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("page or session already closed")]
    Closed,
}

impl BrowserError {
    /// Slow page or element, as opposed to a broken one.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            BrowserError::Timeout { .. } | BrowserError::NavigationTimeout { .. }
        )
    }
}

/// Starts a browser session. One session is shared by every page of a batch.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>, BrowserError>;
}

#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// One tab. Owned by a single adapter call; not shared between tasks.
#[async_trait::async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn set_javascript_enabled(&self, enabled: bool) -> Result<(), BrowserError>;

    /// Resolves the first element matching `locator`, or `BrowserError::Timeout` once `timeout`
    /// has passed without a match.
    async fn wait_for_element(
        &self,
        locator: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError>;

    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>, BrowserError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError>;

    /// Cell texts of every row matching `row_locator`, one `Vec` per row.
    async fn query_rows(&self, row_locator: &str) -> Result<Vec<Vec<String>>, BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// Element state captured when the element was resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSnapshot {
    pub text: Option<String>,
    pub action: Option<ClickAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    Follow {
        href: String,
    },
    Submit {
        action: String,
        method: String,
        fields: Vec<(String, String)>,
    },
}

/// Live element handles of one page.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, ElementSnapshot>>,
}

impl HandleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(self: &Arc<Self>, snapshot: ElementSnapshot) -> ElementHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, snapshot);
        ElementHandle {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn snapshot(&self, element: &ElementHandle) -> Option<ElementSnapshot> {
        self.lock().get(&element.id).cloned()
    }

    pub fn live(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn release(&self, id: u64) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, ElementSnapshot>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Reference to a resolved element. Released from its page when dropped.
#[derive(Debug)]
pub struct ElementHandle {
    id: u64,
    registry: Arc<HandleRegistry>,
}

impl Drop for ElementHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}
