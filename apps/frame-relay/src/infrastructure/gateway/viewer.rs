//! Browser viewer served at `/`.

use axum::response::Html;

const VIEWER_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Frame Relay Live Stream</title>
    <style>
        body { font-family: sans-serif; margin: 2rem; background: #111; color: #eee; }
        #liveStream { max-width: 100%; border: 1px solid #444; }
        #status { font-size: 0.9rem; color: #aaa; }
    </style>
</head>
<body>
    <h1>Live Stream</h1>
    <p id="status">connecting...</p>
    <img id="liveStream" src="" alt="Live Stream" />
    <script>
        const scheme = window.location.protocol === "https:" ? "wss" : "ws";
        const status = document.getElementById("status");
        const image = document.getElementById("liveStream");

        function connect() {
            const ws = new WebSocket(scheme + "://" + window.location.host + "/ws");
            ws.onopen = () => { status.textContent = "connected"; };
            ws.onmessage = (event) => { image.src = event.data; };
            ws.onerror = (error) => { console.error("WebSocket error:", error); };
            ws.onclose = () => {
                status.textContent = "disconnected, retrying...";
                setTimeout(connect, 1000);
            };
        }

        connect();
    </script>
</body>
</html>
"#;

/// Serve the viewer page.
pub async fn viewer_handler() -> Html<&'static str> {
    Html(VIEWER_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_connects_to_same_host() {
        assert!(VIEWER_HTML.contains("window.location.host + \"/ws\""));
        assert!(VIEWER_HTML.contains("image.src = event.data"));
    }
}
