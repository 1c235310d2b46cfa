//! View routing and share links
//!
//! A page URL carrying `?view=<session id>` opens a passive viewer of that
//! camera; anything else runs the camera host.

use crate::CamWatchError;
use url::Url;

/// Query parameter naming the camera to view
pub const VIEW_PARAM: &str = "view";

/// How this instance behaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
    /// Capture, detect and share the local camera
    Host,
    /// Watch a remote camera; `None` when the parameter is present but empty
    Viewer {
        /// Session ID of the camera to watch
        remote_id: Option<String>,
    },
}

impl AppMode {
    /// Whether this is a viewer
    pub fn is_viewer(&self) -> bool {
        matches!(self, AppMode::Viewer { .. })
    }
}

/// Chooses between host and viewer from the page URL
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewRouter;

impl ViewRouter {
    /// Route a URL string
    pub fn route(url: &str) -> Result<AppMode, CamWatchError> {
        let parsed = parse(url)?;
        Ok(Self::route_url(&parsed))
    }

    /// Route a parsed URL; the first `view` parameter wins
    pub fn route_url(url: &Url) -> AppMode {
        url.query_pairs()
            .find(|(key, _)| key == VIEW_PARAM)
            .map(|(_, value)| {
                let value = value.trim();
                AppMode::Viewer {
                    remote_id: (!value.is_empty()).then(|| value.to_string()),
                }
            })
            .unwrap_or(AppMode::Host)
    }

    /// Link that opens a viewer of `local_id`: origin and path of `base`
    /// followed by `?view=<local_id>`
    pub fn share_link(base: &str, local_id: &str) -> Result<String, CamWatchError> {
        let mut url = parse(base)?;
        url.set_fragment(None);
        url.set_query(None);
        url.query_pairs_mut().append_pair(VIEW_PARAM, local_id);
        Ok(url.into())
    }
}

fn parse(url: &str) -> Result<Url, CamWatchError> {
    Url::parse(url).map_err(|e| CamWatchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
