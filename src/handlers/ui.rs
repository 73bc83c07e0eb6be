use axum::{extract::State, response::Html};
use std::sync::Arc;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

// Single page dashboard, settings baked in at request time
pub async fn ui_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(
        state.cooldown_secs(),
        state.default_lp,
        state.upstream.base_url(),
    ))
}

fn render_index(cooldown_secs: u64, default_lp: u32, backend: &str) -> String {
    INDEX_HTML
        .replace("__COOLDOWN__", &cooldown_secs.to_string())
        .replace("__DEFAULT_LP__", &default_lp.to_string())
        .replace("__BACKEND__", &escape_html(backend))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
