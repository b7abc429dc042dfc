use std::future::Future;
use std::time::Duration;

use futures_util::future::{select, Either, LocalBoxFuture};
use futures_util::FutureExt;
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{PlayerConfig, DEFAULT_APP_NAME};
use crate::player::Timer;

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

const SITE_CONTENT_PATH: &str = "/content/site.json";

/// The player mounts with defaults once this elapses without a feed response.
pub const SITE_CONTENT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    pub app_name: Option<String>,
}

/// The subset of the site content feed the player reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteContent {
    pub settings: SiteSettings,
    pub player: Option<PlayerConfig>,
}

impl SiteContent {
    pub fn app_name(&self) -> String {
        self.settings
            .app_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_APP_NAME)
            .to_string()
    }

    pub fn player_config(&self) -> PlayerConfig {
        self.player.clone().unwrap_or_default().normalized()
    }
}

pub fn site_content_url(origin: &str) -> String {
    format!("{}{}", origin.trim_end_matches('/'), SITE_CONTENT_PATH)
}

pub async fn fetch_site_content(origin: &str) -> Result<SiteContent, String> {
    let url = site_content_url(origin);
    let response = HTTP_CLIENT
        .get(&url)
        .header("Cache-Control", "no-store")
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("Site content request failed: {}", response.status()));
    }

    response
        .json::<SiteContent>()
        .await
        .map_err(|e| e.to_string())
}

/// Never fails: a missing origin or a failed or stalled feed yields the defaults.
pub async fn load_site_content(origin: Option<String>, timer: &dyn Timer) -> SiteContent {
    let Some(origin) = origin else {
        debug!("no site origin, using default site content");
        return SiteContent::default();
    };
    settle_site_content(
        fetch_site_content(&origin),
        timer.sleep(SITE_CONTENT_TIMEOUT),
    )
    .await
}

async fn settle_site_content(
    fetch: impl Future<Output = Result<SiteContent, String>>,
    deadline: LocalBoxFuture<'_, ()>,
) -> SiteContent {
    match select(fetch.boxed_local(), deadline).await {
        Either::Left((Ok(content), _)) => content,
        Either::Left((Err(reason), _)) => {
            warn!(%reason, "site content unavailable, using defaults");
            SiteContent::default()
        }
        Either::Right(((), _)) => {
            warn!(
                timeout_ms = SITE_CONTENT_TIMEOUT.as_millis() as u64,
                "site content timed out, using defaults"
            );
            SiteContent::default()
        }
    }
}
