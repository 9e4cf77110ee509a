//! Script-unpack strategy.
//!
//! The player page ships a packed script. Once unpacked it names a service
//! and a follow-up endpoint template; the endpoint answers with JSON that
//! holds the media URL.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::deobfuscate::get_and_unpack;
use crate::error::Result;
use crate::http_client::FetchRequest;
use crate::stream::context::ResolveContext;
use crate::stream::source::Target;
use crate::stream::types::StreamCandidate;
use crate::urls::{is_http_url, unescape_url};

static SERVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"service\s*=\s*['"]([^'"]+)"#).unwrap());
static CHECK_ENDPOINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"](\S+check&id\S+?)['"]"#).unwrap());

#[derive(Debug, Clone)]
pub struct ScriptUnpackStrategy {
    /// Player page holding the packed script.
    pub target: Target,
    pub service_pattern: Regex,
    pub endpoint_pattern: Regex,
    /// Replaced by the service name inside the endpoint.
    pub placeholder: String,
    /// JSON pointer to the media URL in the endpoint response.
    pub result_pointer: String,
    pub referer: Target,
}

impl ScriptUnpackStrategy {
    /// `service = '...'` plus a `...check&id...` endpoint; URL at `/data`.
    pub fn service_check(target: Target, referer: Target) -> Self {
        Self {
            target,
            service_pattern: SERVICE.clone(),
            endpoint_pattern: CHECK_ENDPOINT.clone(),
            placeholder: "\"+service+\"".to_string(),
            result_pointer: "/data".to_string(),
            referer,
        }
    }

    pub(crate) async fn run(&self, ctx: &ResolveContext<'_>) -> Result<Vec<StreamCandidate>> {
        let Some(url) = ctx.render(&self.target) else {
            return Ok(Vec::new());
        };
        let page = ctx.page(&url).await?;
        let Some(endpoint) = self.endpoint(&page.body) else {
            debug!(url, "no service endpoint in player script");
            return Ok(Vec::new());
        };

        let mut request = FetchRequest::get(&endpoint);
        if let Some(referer) = ctx.render(&self.referer) {
            request = request.referer(referer);
        }
        let response = ctx.fetch(request).await?;
        let value: Value = serde_json::from_str(&response.body)?;

        let media = value
            .pointer(&self.result_pointer)
            .and_then(Value::as_str)
            .map(|u| unescape_url(u.trim()))
            .filter(|u| is_http_url(u));
        Ok(media.map(StreamCandidate::video).into_iter().collect())
    }

    /// Unpack the page scripts and build the follow-up endpoint.
    pub fn endpoint(&self, html: &str) -> Option<String> {
        let script = get_and_unpack(html);
        let service = self.service_pattern.captures(&script)?.get(1)?.as_str().to_string();
        let template = self.endpoint_pattern.captures(&script)?.get(1)?.as_str().to_string();
        Some(unescape_url(&template.replace(&self.placeholder, &service)))
    }
}
