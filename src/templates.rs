//! HTML templates and styling for the writer page.
//!
//! The page is a thin view: it streams the editor text and gestures to the
//! session socket and renders whatever snapshot comes back.

use crate::models::ColorToken;

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
:root {
    --bg: #fbfaf7;
    --fg: #3b3a36;
    --muted: #9a978f;
    --border: #e8e5dd;
    --info: #2f6f4f;
    --error: #a33a2a;
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: Georgia, "Times New Roman", serif;
    color: var(--fg);
    background: var(--bg);
    height: 100vh;
    display: flex;
    overflow: hidden;
}

.writer {
    flex: 1;
    display: flex;
    flex-direction: column;
    padding: 2rem;
    border-right: 1px solid var(--border);
    min-width: 320px;
}

.writer textarea {
    flex: 1;
    font: inherit;
    font-size: 1.15rem;
    line-height: 1.7;
    border: none;
    outline: none;
    resize: none;
    background: transparent;
    color: var(--fg);
}

.preview {
    font-size: 1.15rem;
    line-height: 1.7;
    max-height: 30vh;
    overflow-y: auto;
    border-top: 1px solid var(--border);
    padding-top: 1rem;
    white-space: pre-wrap;
}

.preview .caret {
    display: inline-block;
    width: 1px;
    height: 1.1em;
    margin: 0 -0.5px;
    vertical-align: text-bottom;
    background: var(--fg);
}

.preview .kw {
    border-radius: 3px;
    padding: 0 2px;
    cursor: pointer;
}

.status { color: var(--muted); font-size: 0.85rem; min-height: 1.2rem; }

.viewport {
    flex: 2;
    position: relative;
    overflow: hidden;
    background: #f3f1ec;
}

.canvas {
    position: absolute;
    left: 12px;
    top: 12px;
    transition: transform 0.6s ease;
}

.card {
    position: absolute;
    border-radius: 6px;
    overflow: hidden;
    box-shadow: 0 2px 8px rgba(0, 0, 0, 0.12);
    cursor: pointer;
    border: 3px solid transparent;
}

.card img { width: 100%; height: 100%; object-fit: cover; display: block; }
.card.selected { box-shadow: 0 6px 24px rgba(0, 0, 0, 0.3); }

.card .credit {
    position: absolute;
    bottom: 0;
    left: 0;
    right: 0;
    font-size: 0.7rem;
    padding: 0.25rem 0.5rem;
    background: rgba(0, 0, 0, 0.45);
    color: #fff;
}

.card .credit a { color: #fff; }

.toast {
    position: fixed;
    bottom: 1.5rem;
    right: 1.5rem;
    padding: 0.6rem 1rem;
    border-radius: 4px;
    color: #fff;
    font-size: 0.9rem;
}

.toast.info { background: var(--info); }
.toast.error { background: var(--error); }
"#;

// ============================================================================
// Writer Script
// ============================================================================

pub const WRITER_JS: &str = r#"
(function () {
    const input = document.getElementById('text');
    const preview = document.getElementById('preview');
    const status = document.getElementById('status');
    const viewport = document.getElementById('viewport');
    const canvas = document.getElementById('canvas');
    const toast = document.getElementById('toast');

    const proto = location.protocol === 'https:' ? 'wss:' : 'ws:';
    const ws = new WebSocket(proto + '//' + location.host + '/ws');
    const send = (msg) => { if (ws.readyState === 1) ws.send(JSON.stringify(msg)); };

    function escapeHtml(str) {
        const div = document.createElement('div');
        div.textContent = str == null ? '' : String(str);
        return div.innerHTML;
    }

    function reportViewport() {
        const r = viewport.getBoundingClientRect();
        send({ type: 'viewport', width: r.width, height: r.height, padding_left: 12, padding_top: 12 });
    }

    function spanText(content, i, caret) {
        if (!caret || caret.span !== i) return escapeHtml(content);
        const chars = Array.from(content);
        return escapeHtml(chars.slice(0, caret.offset).join(''))
            + '<span class="caret"></span>'
            + escapeHtml(chars.slice(caret.offset).join(''));
    }

    function renderSpans(spans, caret) {
        preview.innerHTML = spans.map((s, i) => s.type === 'keyword'
            ? `<span class="kw" data-keyword="${escapeHtml(s.keyword)}" style="background:${s.color}">${spanText(s.content, i, caret)}</span>`
            : spanText(s.content, i, caret)).join('');
    }

    function reportCaret() {
        const offset = Array.from(input.value.slice(0, input.selectionStart)).length;
        send({ type: 'caret', offset: offset });
    }

    function renderGallery(snap) {
        if (snap.canvas) {
            canvas.style.width = snap.canvas.width + 'px';
            canvas.style.height = snap.canvas.height + 'px';
        }
        const t = snap.transform;
        canvas.style.transform = `translate(${t.offset_x}px, ${t.offset_y}px) scale(${t.scale})`;
        canvas.innerHTML = snap.gallery.map((item, i) => {
            const pos = snap.positions[i];
            const size = snap.sizes[i];
            if (!pos || !size) return '';
            const credit = item.photographer_profile
                ? `<a href="${escapeHtml(item.photographer_profile)}" target="_blank" rel="noopener">${escapeHtml(item.photographer_name)}</a>`
                : escapeHtml(item.photographer_name);
            const cls = snap.selected === i ? 'card selected' : 'card';
            return `<div class="${cls}" data-index="${i}" style="left:${pos.x}px;top:${pos.y}px;width:${size.width}px;height:${size.height}px;border-color:${item.keywordColor}">`
                + `<img src="${escapeHtml(item.url)}" alt="${escapeHtml(item.alt_description)}">`
                + `<div class="credit">${credit}</div></div>`;
        }).join('');
    }

    function renderStatus(snap) {
        const parts = [];
        if (snap.searching) parts.push('Searching…');
        if (snap.current_keyword) parts.push('Current: ' + snap.current_keyword);
        status.textContent = parts.join(' · ');
        if (snap.notification) {
            toast.className = 'toast ' + snap.notification.type;
            toast.textContent = snap.notification.message;
            toast.hidden = false;
        } else {
            toast.hidden = true;
        }
    }

    ws.onopen = reportViewport;
    ws.onmessage = (ev) => {
        const msg = JSON.parse(ev.data);
        if (msg.type === 'snapshot') {
            renderSpans(msg.spans, msg.caret);
            renderGallery(msg);
            renderStatus(msg);
        }
    };

    input.addEventListener('input', () => {
        send({ type: 'text', text: input.value });
        reportCaret();
    });
    input.addEventListener('keyup', reportCaret);
    input.addEventListener('click', reportCaret);
    window.addEventListener('resize', reportViewport);

    preview.addEventListener('click', (ev) => {
        const kw = ev.target.closest('.kw');
        if (kw) send({ type: 'focus_keyword', keyword: kw.dataset.keyword });
    });

    canvas.addEventListener('click', (ev) => {
        const card = ev.target.closest('.card');
        if (card && !ev.target.closest('a')) send({ type: 'select', index: Number(card.dataset.index) });
    });

    viewport.addEventListener('wheel', (ev) => {
        ev.preventDefault();
        send({ type: 'wheel', delta_y: ev.deltaY });
    }, { passive: false });

    let drag = null;
    viewport.addEventListener('mousedown', (ev) => { drag = { x: ev.clientX, y: ev.clientY }; });
    window.addEventListener('mouseup', () => { drag = null; });
    window.addEventListener('mousemove', (ev) => {
        if (!drag) return;
        send({ type: 'pan', dx: ev.clientX - drag.x, dy: ev.clientY - drag.y });
        drag = { x: ev.clientX, y: ev.clientY };
    });

    document.addEventListener('keydown', (ev) => {
        if (ev.target === input) return;
        if (ev.key === 'ArrowRight') send({ type: 'next' });
        else if (ev.key === 'ArrowLeft') send({ type: 'previous' });
        else if (ev.key === 'Escape') send({ type: 'close' });
    });
})();
"#;

// ============================================================================
// Rendering
// ============================================================================

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>{}</style>
</head>
<body>
{}
</body>
</html>"#,
        html_escape(title),
        STYLE,
        content
    )
}

pub fn render_writer_page() -> String {
    let content = format!(
        r#"<section class="writer">
    <textarea id="text" placeholder="Start writing..." autofocus></textarea>
    <div id="status" class="status"></div>
    <div id="preview" class="preview"></div>
</section>
<section id="viewport" class="viewport" style="--mint:{};--sky:{}">
    <div id="canvas" class="canvas"></div>
</section>
<div id="toast" class="toast" hidden></div>
<script>{}</script>"#,
        ColorToken::Mint.hex(),
        ColorToken::Sky.hex(),
        WRITER_JS
    );
    base_html("AuraScribe", &content)
}
