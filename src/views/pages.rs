//! Server-rendered pages for the landing page and the admin panel.
//!
//! Pages are assembled as strings; every value that originated from a user
//! (original filenames) passes through `html_escape`.

use crate::models::video::{Library, VideoRecord};
use chrono::SecondsFormat;

const STYLE: &str = r#"<style>
body{font-family:system-ui,sans-serif;max-width:960px;margin:0 auto;padding:1rem;background:#111;color:#eee}
video{width:100%;max-height:70vh;background:#000}
table{width:100%;border-collapse:collapse}
td,th{padding:.4rem;border-bottom:1px solid #333;text-align:left}
.current{color:#6c6}
button{cursor:pointer}
.empty{color:#999}
</style>"#;

/// Public landing page: current video player plus the full list.
pub fn render_index(library: &Library) -> String {
    let mut html = page_head("Video");
    html.push_str("<h1>Video</h1>");
    push_player(&mut html, library.current.as_ref());

    html.push_str("<h2>All videos</h2>");
    if library.videos.is_empty() {
        html.push_str(r#"<p class="empty">No videos uploaded yet.</p>"#);
    } else {
        html.push_str("<ul>");
        for video in &library.videos {
            html.push_str(&format!(
                r#"<li><a href="{}">{}</a> ({}){}</li>"#,
                video.public_path(),
                html_escape(&video.original_name),
                format_size(video.size_bytes),
                if video.is_current {
                    r#" <span class="current">current</span>"#
                } else {
                    ""
                }
            ));
        }
        html.push_str("</ul>");
    }

    html.push_str("</body></html>");
    html
}

/// Admin page: upload form and per-video controls.
pub fn render_admin(library: &Library) -> String {
    let mut html = page_head("Video admin");
    html.push_str("<h1>Video admin</h1>");

    html.push_str(concat!(
        r#"<form id="upload-form">"#,
        r#"<input type="file" name="video" accept="video/*" required> "#,
        r#"<button type="submit">Upload</button> "#,
        r#"<span id="status"></span>"#,
        r#"</form>"#
    ));

    html.push_str("<h2>Current video</h2>");
    push_player(&mut html, library.current.as_ref());

    html.push_str("<h2>Stored videos</h2>");
    if library.videos.is_empty() {
        html.push_str(r#"<p class="empty">No videos uploaded yet.</p>"#);
    } else {
        html.push_str(
            "<table><tr><th>Name</th><th>Uploaded</th><th>Size</th><th></th></tr>",
        );
        for video in &library.videos {
            push_admin_row(&mut html, video);
        }
        html.push_str("</table>");
    }

    html.push_str(ADMIN_SCRIPT);
    html.push_str("</body></html>");
    html
}

fn page_head(title: &str) -> String {
    let mut html = String::from("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str(r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#);
    html.push_str(&format!("<title>{}</title>", html_escape(title)));
    html.push_str(STYLE);
    html.push_str("</head><body>");
    html
}

fn push_player(html: &mut String, current: Option<&VideoRecord>) {
    match current {
        Some(video) => {
            html.push_str(&format!(
                r#"<video controls playsinline preload="metadata" src="{}"></video>"#,
                video.public_path()
            ));
            html.push_str(&format!("<p>{}</p>", html_escape(&video.original_name)));
        }
        None => html.push_str(r#"<p class="empty">No video selected.</p>"#),
    }
}

fn push_admin_row(html: &mut String, video: &VideoRecord) {
    html.push_str("<tr>");
    html.push_str(&format!(
        r#"<td><a href="{}">{}</a>{}</td>"#,
        video.public_path(),
        html_escape(&video.original_name),
        if video.is_current {
            r#" <span class="current">(current)</span>"#
        } else {
            ""
        }
    ));
    html.push_str(&format!(
        "<td>{}</td>",
        video
            .uploaded_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    html.push_str(&format!("<td>{}</td>", format_size(video.size_bytes)));
    html.push_str("<td>");
    if !video.is_current {
        html.push_str(&format!(
            r#"<button onclick="setCurrent({})">Make current</button> "#,
            video.id
        ));
    }
    html.push_str(&format!(
        r#"<button onclick="deleteVideo({})">Delete</button>"#,
        video.id
    ));
    html.push_str("</td></tr>");
}

const ADMIN_SCRIPT: &str = r#"<script>
const statusEl = document.getElementById('status');
async function call(method, url, body) {
  const res = await fetch(url, { method, body, credentials: 'same-origin' });
  const data = await res.json().catch(() => ({}));
  if (!res.ok) { throw new Error(data.error || res.statusText); }
  return data;
}
document.getElementById('upload-form').addEventListener('submit', async (e) => {
  e.preventDefault();
  statusEl.textContent = 'Uploading...';
  try {
    const data = await call('POST', '/upload', new FormData(e.target));
    statusEl.textContent = data.message;
    location.reload();
  } catch (err) { statusEl.textContent = err.message; }
});
async function setCurrent(id) {
  try { await call('POST', '/set-current-video/' + id); location.reload(); }
  catch (err) { alert(err.message); }
}
async function deleteVideo(id) {
  if (!confirm('Delete this video?')) return;
  try { await call('DELETE', '/delete-video/' + id); location.reload(); }
  catch (err) { alert(err.message); }
}
</script>"#;

/// Human-readable size in MB with two decimals.
pub fn format_size(size_bytes: i64) -> String {
    format!("{:.2} MB", size_bytes.max(0) as f64 / (1024.0 * 1024.0))
}

pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
