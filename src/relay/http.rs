//! HTTP control endpoint
//!
//! `GET /iotdimmer?intensity=<n>&token=<t>&device=<d>` queues a level for a
//! device and answers with a small HTML control page.

use crate::relay::queue::ControlQueue;
use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};
use std::fmt::Write as _;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Path of the control resource (compared case-insensitively)
pub const CONTROL_PATH: &str = "/iotdimmer";

const PARAM_INTENSITY: &str = "intensity";
const PARAM_TOKEN: &str = "token";
const PARAM_DEVICE: &str = "device";

/// Shared state for the control endpoint
#[derive(Debug)]
pub struct RelayState {
    pub queue: Arc<ControlQueue>,
    pub token: String,
    pub max_level: i64,
}

/// Router answering every path; unknown paths get 404
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .fallback(handle_control)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Parsed `intensity`, `token`, `device` parameters; first occurrence wins
#[derive(Debug, Default, PartialEq, Eq)]
struct ControlParams {
    intensity: Option<String>,
    token: Option<String>,
    device: Option<String>,
}

impl ControlParams {
    fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                PARAM_INTENSITY => &mut params.intensity,
                PARAM_TOKEN => &mut params.token,
                PARAM_DEVICE => &mut params.device,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

async fn handle_control(
    State(state): State<Arc<RelayState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    if uri.path().trim().to_lowercase() != CONTROL_PATH {
        return StatusCode::NOT_FOUND.into_response();
    }

    let params = ControlParams::parse(uri.query());
    let (Some(intensity), Some(token), Some(device)) =
        (params.intensity, params.token, params.device)
    else {
        debug!("Control request missing parameters: {}", uri.path());
        return StatusCode::BAD_REQUEST.into_response();
    };

    let Ok(intensity) = intensity.trim().parse::<i32>() else {
        return StatusCode::RANGE_NOT_SATISFIABLE.into_response();
    };
    let intensity = i64::from(intensity);

    if token != state.token {
        return StatusCode::FORBIDDEN.into_response();
    }

    let mut message = String::new();
    if (0..=state.max_level).contains(&intensity) {
        message = match state.queue.upsert(&device, intensity).await {
            Some(previous) => format!(
                "Received command: {device} will switch intensity to {intensity} instead of {previous}"
            ),
            None => format!("Received command: {device} will switch intensity to {intensity}"),
        };
        info!("{message}");
    } else {
        debug!("Intensity {intensity} for {device} outside 0..={}", state.max_level);
    }

    Html(control_page(&message, &token, &device, state.max_level)).into_response()
}

/// Full HTML document: status line plus one link per level
pub fn control_page(message: &str, token: &str, device: &str, max_level: i64) -> String {
    let token = escape_html(token);
    let device = escape_html(device);

    let mut page = String::from("<!DOCTYPE HTML>\n<HTML>\n<HEAD>\n</HEAD>\n<BODY>\n");
    page.push_str(&escape_html(message));
    page.push_str("<br><br><b>Select intensity:</b><br>\n");
    for level in 0..=max_level {
        let label = if level == 0 {
            "Off".to_string()
        } else {
            format!("Intensity {level}")
        };
        let _ = writeln!(
            page,
            "<a href = '{CONTROL_PATH}?intensity={level}&token={token}&device={device}'>{label}</a><br>"
        );
    }
    page.push_str("</BODY>\n</HTML>\n");
    page
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
