/// Default agent server address.
pub const DEFAULT_AGENT_BASE_URL: &str = "http://127.0.0.1:3456";

/// Normalize a configured base URL to an HTTP(S) origin with no trailing slash.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_AGENT_BASE_URL`]
/// 2) `ws://`/`wss://` become `http://`/`https://`
/// 3) a bare `host:port` gets `http://`
/// 4) a trailing `/ws` or `/ws/<client>` suffix is dropped
pub fn normalize_base_url(input: &str) -> String {
    let trimmed = input.trim();
    let base = if trimmed.is_empty() {
        DEFAULT_AGENT_BASE_URL
    } else {
        trimmed
    };

    let with_scheme = if let Some(rest) = base.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = base.strip_prefix("ws://") {
        format!("http://{rest}")
    } else if base.starts_with("http://") || base.starts_with("https://") {
        base.to_string()
    } else {
        format!("http://{base}")
    };

    let mut normalized = with_scheme.trim_end_matches('/').to_string();
    if let Some(index) = ws_suffix_start(&normalized) {
        normalized.truncate(index);
    }
    normalized
}

/// Build the WebSocket endpoint `ws(s)://host[:port]/ws/<client_id>`.
pub fn websocket_url(base_url: &str, client_id: &str) -> String {
    let origin = normalize_base_url(base_url);
    let ws_origin = if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = origin.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        origin
    };

    format!("{ws_origin}/ws/{}", sanitize_client_id(client_id))
}

/// Build a REST endpoint URL under the normalized base.
pub fn rest_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        path.trim_start_matches('/')
    )
}

/// Restricts a client identifier to URL-path-safe characters.
pub fn sanitize_client_id(client_id: &str) -> String {
    let sanitized: String = client_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "cowork".to_string()
    } else {
        sanitized
    }
}

fn ws_suffix_start(url: &str) -> Option<usize> {
    let scheme_end = url.find("://").map_or(0, |index| index + 3);
    let path_start = url[scheme_end..].find('/')? + scheme_end;
    let path = &url[path_start..];
    if path == "/ws" || path.starts_with("/ws/") {
        Some(path_start)
    } else {
        None
    }
}
