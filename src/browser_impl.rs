//! Browser driver backed by plain HTTP fetches.
//!
//! Pages are fetched with `reqwest`; no script runs. Navigation and `wait`
//! work on any page. `type_text` and `click` work on `GET` forms, which is
//! enough for search boxes: submitting builds the query URL and navigates
//! to it. JSON responses are reported as captured network calls.

use std::collections::BTreeMap;
use std::time::Duration;

use agent_core::{BrowserAction, BrowserDriver, BrowserError, BrowserSession, CapturedExchange};
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;
use webnav_core_types::{CapturedRequest, CapturedResponse};

const USER_AGENT: &str = concat!("webnav/", env!("CARGO_PKG_VERSION"));

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));
static FORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form>").expect("form regex"));
static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(input|textarea|select|button)\b([^>]*)>").expect("field regex")
});
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute regex")
});
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<([a-z][a-z0-9]*)\b([^>]*)>").expect("tag regex"));

/// Element selectors the driver understands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    Id(String),
    Name(String),
    Tag(String),
}

impl Selector {
    /// Parses `#id`, `[name="q"]`, `input[name=q]` and bare tag names.
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix('#') {
            return (!id.is_empty()).then(|| Selector::Id(id.to_string()));
        }
        if let Some(open) = raw.find('[') {
            let inner = raw[open + 1..].strip_suffix(']')?;
            let (attr, value) = inner.split_once('=')?;
            if attr.trim() != "name" {
                return None;
            }
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            return (!value.is_empty()).then(|| Selector::Name(value.to_string()));
        }
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Some(Selector::Tag(raw.to_ascii_lowercase()));
        }
        None
    }

    fn matches(&self, tag: &str, attrs: &BTreeMap<String, String>) -> bool {
        match self {
            Selector::Id(id) => attrs.get("id") == Some(id),
            Selector::Name(name) => attrs.get("name") == Some(name),
            Selector::Tag(expected) => tag.eq_ignore_ascii_case(expected),
        }
    }
}

fn parse_attrs(raw: &str) -> BTreeMap<String, String> {
    ATTR_RE
        .captures_iter(raw)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (caps[1].to_ascii_lowercase(), value)
        })
        .collect()
}

#[derive(Debug, Clone)]
struct FormField {
    tag: String,
    attrs: BTreeMap<String, String>,
}

impl FormField {
    fn name(&self) -> Option<&str> {
        self.attrs.get("name").map(String::as_str)
    }

    fn is_submit(&self) -> bool {
        match self.tag.as_str() {
            "button" => self.attrs.get("type").map_or(true, |t| t == "submit"),
            "input" => matches!(
                self.attrs.get("type").map(String::as_str),
                Some("submit") | Some("image")
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct HtmlForm {
    attrs: BTreeMap<String, String>,
    fields: Vec<FormField>,
    values: BTreeMap<String, String>,
}

impl HtmlForm {
    fn method(&self) -> String {
        self.attrs
            .get("method")
            .map(|m| m.to_ascii_uppercase())
            .unwrap_or_else(|| "GET".to_string())
    }

    fn field(&self, selector: &Selector) -> Option<&FormField> {
        self.fields
            .iter()
            .find(|field| selector.matches(&field.tag, &field.attrs))
    }
}

fn parse_forms(page: &str) -> Vec<HtmlForm> {
    FORM_RE
        .captures_iter(page)
        .map(|caps| {
            let fields: Vec<FormField> = FIELD_RE
                .captures_iter(&caps[2])
                .map(|field| FormField {
                    tag: field[1].to_ascii_lowercase(),
                    attrs: parse_attrs(&field[2]),
                })
                .collect();
            let values = fields
                .iter()
                .filter(|field| field.tag == "input" && !field.is_submit())
                .filter_map(|field| {
                    let name = field.name()?;
                    let value = field.attrs.get("value").cloned().unwrap_or_default();
                    Some((name.to_string(), value))
                })
                .collect();
            HtmlForm {
                attrs: parse_attrs(&caps[1]),
                fields,
                values,
            }
        })
        .collect()
}

fn page_title(page: &str) -> String {
    TITLE_RE
        .captures(page)
        .map(|caps| caps[1].split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn page_has(page: &str, selector: &Selector) -> bool {
    TAG_RE
        .captures_iter(page)
        .any(|caps| selector.matches(&caps[1], &parse_attrs(&caps[2])))
}

pub struct HttpBrowserDriver {
    client: Client,
}

impl HttpBrowserDriver {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client for the browser driver")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BrowserDriver for HttpBrowserDriver {
    async fn create_session(&self, headless: bool) -> Result<Box<dyn BrowserSession>, BrowserError> {
        debug!(headless, "opening http browser session");
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            url: String::new(),
            title: String::new(),
            page: String::new(),
            forms: Vec::new(),
            captured: Vec::new(),
            closed: false,
        }))
    }
}

struct HttpSession {
    client: Client,
    url: String,
    title: String,
    page: String,
    forms: Vec<HtmlForm>,
    captured: Vec<CapturedExchange>,
    closed: bool,
}

impl HttpSession {
    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::SessionLost("session closed".to_string()));
        }
        Ok(())
    }

    async fn load(&mut self, url: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| BrowserError::navigation(url, err.to_string()))?;

        let status = response.status();
        let landed = response.url().to_string();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |value| value.contains("json"));
        let body = response
            .text()
            .await
            .map_err(|err| BrowserError::navigation(url, err.to_string()))?;

        if is_json {
            let parsed = serde_json::from_str::<Value>(&body).ok();
            self.captured.push((
                CapturedRequest::new("GET", landed.clone()),
                Some(CapturedResponse::new(status.as_u16(), parsed)),
            ));
        }
        if !status.is_success() {
            return Err(BrowserError::navigation(url, format!("HTTP {status}")));
        }

        info!(url = %landed, status = status.as_u16(), "page loaded");
        self.title = page_title(&body);
        self.forms = parse_forms(&body);
        self.page = body;
        self.url = landed;
        Ok(())
    }

    fn locate(&self, selector: &Selector) -> Option<usize> {
        self.forms
            .iter()
            .position(|form| form.field(selector).is_some())
    }

    fn submission_url(&self, form: &HtmlForm) -> Result<String, BrowserError> {
        let method = form.method();
        if method != "GET" {
            return Err(BrowserError::Unsupported(format!(
                "form submission with method {method}"
            )));
        }
        let base = Url::parse(&self.url)
            .map_err(|err| BrowserError::action(format!("current url invalid: {err}")))?;
        let action = form.attrs.get("action").map(String::as_str).unwrap_or("");
        let mut target = base
            .join(action)
            .map_err(|err| BrowserError::action(format!("form action invalid: {err}")))?;
        target
            .query_pairs_mut()
            .clear()
            .extend_pairs(form.values.iter());
        Ok(target.to_string())
    }

    async fn submit(&mut self, form_index: usize) -> Result<(), BrowserError> {
        let url = match self.forms.get(form_index) {
            Some(form) => self.submission_url(form)?,
            None => return Err(BrowserError::action("form vanished before submit")),
        };
        debug!(url = %url, "submitting form");
        self.load(&url).await
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.load(url).await
    }

    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn page_source(&self) -> String {
        self.page.clone()
    }

    async fn run_action(&mut self, action: &BrowserAction) -> Result<(), BrowserError> {
        self.ensure_open()?;
        match action {
            BrowserAction::Navigate { url } => self.load(url).await,
            BrowserAction::Wait { selector, .. } => {
                if self.find(selector).await? {
                    Ok(())
                } else {
                    Err(BrowserError::ElementNotFound(selector.clone()))
                }
            }
            BrowserAction::TypeText {
                selector,
                text,
                submit,
            } => {
                let parsed = Selector::parse(selector)
                    .ok_or_else(|| BrowserError::Unsupported(format!("selector {selector}")))?;
                let index = self
                    .locate(&parsed)
                    .ok_or_else(|| BrowserError::ElementNotFound(selector.clone()))?;
                let form = &mut self.forms[index];
                let name = form
                    .field(&parsed)
                    .and_then(FormField::name)
                    .map(str::to_string)
                    .ok_or_else(|| BrowserError::action(format!("{selector} has no name")))?;
                form.values.insert(name, text.clone());
                if *submit {
                    self.submit(index).await
                } else {
                    Ok(())
                }
            }
            BrowserAction::Click { selector } => {
                let parsed = Selector::parse(selector)
                    .ok_or_else(|| BrowserError::Unsupported(format!("selector {selector}")))?;
                let index = self
                    .locate(&parsed)
                    .ok_or_else(|| BrowserError::ElementNotFound(selector.clone()))?;
                let is_submit = self.forms[index]
                    .field(&parsed)
                    .map_or(false, FormField::is_submit);
                if !is_submit {
                    return Err(BrowserError::Unsupported(format!(
                        "click on {selector} (only form submit buttons)"
                    )));
                }
                self.submit(index).await
            }
        }
    }

    async fn find(&mut self, selector: &str) -> Result<bool, BrowserError> {
        self.ensure_open()?;
        let parsed = Selector::parse(selector)
            .ok_or_else(|| BrowserError::Unsupported(format!("selector {selector}")))?;
        Ok(page_has(&self.page, &parsed))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closed = true;
        self.forms.clear();
        Ok(())
    }

    fn drain_captured(&mut self) -> Vec<CapturedExchange> {
        std::mem::take(&mut self.captured)
    }
}
