use crate::browser::{
    Browser, BrowserError, BrowserLauncher, ClickAction, ElementHandle, ElementSnapshot,
    HandleRegistry, Page,
};
use crate::config::Settings;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BLANK_URL: &str = "about:blank";

/// Launches static-markup sessions: pages are fetched over HTTP, scripts never run, and cookies
/// persist for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct HttpLauncher {
    user_agent: String,
    request_timeout: Duration,
}

impl HttpLauncher {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            request_timeout: settings.request_timeout,
        }
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, BrowserError> {
        let http = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .cookie_store(true)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        tracing::debug!(timeout = ?self.request_timeout, "http browser session launched");
        Ok(Box::new(HttpBrowser {
            http,
            request_timeout: self.request_timeout,
            closed: AtomicBool::new(false),
        }))
    }
}

#[derive(Debug)]
pub struct HttpBrowser {
    http: reqwest::Client,
    request_timeout: Duration,
    closed: AtomicBool,
}

#[async_trait::async_trait]
impl Browser for HttpBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrowserError::Closed);
        }
        Ok(Box::new(HttpPage::new(
            self.http.clone(),
            self.request_timeout,
        )))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!("http browser session closed");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: Option<Url>,
    html: String,
}

#[derive(Debug)]
pub struct HttpPage {
    http: reqwest::Client,
    request_timeout: Duration,
    state: tokio::sync::Mutex<PageState>,
    javascript: AtomicBool,
    handles: Arc<HandleRegistry>,
    closed: AtomicBool,
}

impl HttpPage {
    fn new(http: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            http,
            request_timeout,
            state: tokio::sync::Mutex::new(PageState::default()),
            javascript: AtomicBool::new(true),
            handles: HandleRegistry::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrowserError::Closed);
        }
        Ok(())
    }

    async fn resolve(&self, target: &str) -> Result<Url, BrowserError> {
        let state = self.state.lock().await;
        let parsed = match state.url.as_ref() {
            Some(base) => base.join(target),
            None => Url::parse(target),
        };
        parsed.map_err(|e| BrowserError::Navigation {
            url: target.to_string(),
            detail: e.to_string(),
        })
    }

    async fn load(&self, request: reqwest::RequestBuilder, url: &Url) -> Result<(), BrowserError> {
        let res = request
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;
        let status = res.status();
        let final_url = res.url().clone();
        let html = res.text().await.map_err(|e| self.request_error(url, e))?;

        // Error pages are documents too; their locators just never match.
        if !status.is_success() {
            tracing::warn!(%url, %status, "page answered with an error status");
        }

        if final_url != *url {
            tracing::debug!(from = %url, to = %final_url, "navigation redirected");
        }

        // Elements resolved against the previous document no longer exist.
        self.handles.clear();
        let mut state = self.state.lock().await;
        state.url = Some(final_url);
        state.html = html;
        Ok(())
    }

    fn request_error(&self, url: &Url, err: reqwest::Error) -> BrowserError {
        if err.is_timeout() {
            BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout: self.request_timeout,
            }
        } else {
            BrowserError::Http(err)
        }
    }
}

#[async_trait::async_trait]
impl Page for HttpPage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let url = Url::parse(url).map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            detail: e.to_string(),
        })?;
        if self.javascript.load(Ordering::Relaxed) {
            tracing::debug!(%url, "scripts requested but pages are read as static markup");
        }
        self.load(self.http.get(url.clone()), &url).await
    }

    async fn set_javascript_enabled(&self, enabled: bool) -> Result<(), BrowserError> {
        self.ensure_open()?;
        if enabled {
            return Err(BrowserError::Unsupported("script execution"));
        }
        self.javascript.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn wait_for_element(
        &self,
        locator: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        self.ensure_open()?;
        let found = {
            let state = self.state.lock().await;
            first_match(&state.html, locator)?
        };

        // Static markup never changes after load, so waiting longer cannot produce a match.
        match found {
            Some(snapshot) => Ok(self.handles.register(snapshot)),
            None => Err(BrowserError::Timeout {
                locator: locator.to_string(),
                timeout,
            }),
        }
    }

    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>, BrowserError> {
        self.ensure_open()?;
        let snapshot = self
            .handles
            .snapshot(element)
            .ok_or(BrowserError::StaleElement)?;
        Ok(snapshot.text)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let snapshot = self
            .handles
            .snapshot(element)
            .ok_or(BrowserError::StaleElement)?;

        match snapshot.action {
            Some(ClickAction::Follow { href }) => {
                let url = self.resolve(&href).await?;
                self.load(self.http.get(url.clone()), &url).await
            }
            Some(ClickAction::Submit {
                action,
                method,
                fields,
            }) => {
                let url = self.resolve(&action).await?;
                let request = if method.eq_ignore_ascii_case("post") {
                    self.http.post(url.clone()).form(&fields)
                } else {
                    self.http.get(url.clone()).query(&fields)
                };
                self.load(request, &url).await
            }
            None => Err(BrowserError::Unsupported(
                "click on an element without a link or form",
            )),
        }
    }

    async fn query_rows(&self, row_locator: &str) -> Result<Vec<Vec<String>>, BrowserError> {
        self.ensure_open()?;
        let state = self.state.lock().await;
        select_rows(&state.html, row_locator)
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let state = self.state.lock().await;
        Ok(state
            .url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| BLANK_URL.to_string()))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::Release);
        self.handles.clear();
        Ok(())
    }
}

fn selector(locator: &str) -> Result<Selector, BrowserError> {
    Selector::parse(locator).map_err(|e| BrowserError::InvalidLocator {
        locator: locator.to_string(),
        reason: e.to_string(),
    })
}

fn first_match(html: &str, locator: &str) -> Result<Option<ElementSnapshot>, BrowserError> {
    let sel = selector(locator)?;
    let doc = Html::parse_document(html);
    let Some(el) = doc.select(&sel).next() else {
        return Ok(None);
    };

    Ok(Some(ElementSnapshot {
        text: Some(collapse_text(el)),
        action: click_action(el)?,
    }))
}

fn select_rows(html: &str, row_locator: &str) -> Result<Vec<Vec<String>>, BrowserError> {
    let row_sel = selector(row_locator)?;
    let cell_sel = selector("td")?;
    let doc = Html::parse_document(html);

    Ok(doc
        .select(&row_sel)
        .map(|row| row.select(&cell_sel).map(collapse_text).collect())
        .collect())
}

fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn click_action(el: ElementRef<'_>) -> Result<Option<ClickAction>, BrowserError> {
    let tag = el.value().name();
    if tag == "a" {
        return Ok(el.value().attr("href").map(|href| ClickAction::Follow {
            href: href.to_string(),
        }));
    }

    if !matches!(tag, "button" | "input") {
        return Ok(None);
    }

    let Some(form) = el
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "form")
    else {
        return Ok(None);
    };

    let input_sel = selector("input[name]")?;
    let mut fields = Vec::new();
    for input in form.select(&input_sel) {
        let kind = input.value().attr("type").unwrap_or("text");
        if kind.eq_ignore_ascii_case("submit") || kind.eq_ignore_ascii_case("button") {
            continue;
        }
        let checkable = kind.eq_ignore_ascii_case("checkbox") || kind.eq_ignore_ascii_case("radio");
        if checkable && input.value().attr("checked").is_none() {
            continue;
        }
        if let Some(name) = input.value().attr("name") {
            let value = input.value().attr("value").unwrap_or_default();
            fields.push((name.to_string(), value.to_string()));
        }
    }

    // The clicked control contributes its own name/value, like a real submit.
    if let Some(name) = el.value().attr("name") {
        let value = el.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }

    Ok(Some(ClickAction::Submit {
        action: form.value().attr("action").unwrap_or_default().to_string(),
        method: form.value().attr("method").unwrap_or("get").to_string(),
        fields,
    }))
}
