//! Standalone HTML preview of a rendered profile.

use keratovision::{
    compose, AdaptiveRenderer, MemoryDocument, RenderError, RendererOptions, StyleFragment,
    VisionProfile, GUIDE_ID, STYLE_ID, VERSION_MARKER,
};
use keratovision::transforms::reading_guide::{strip_height, BOTTOM_CLASS, STRIP_CLASS, TOP_CLASS};
use serde::{Deserialize, Serialize};

/// Current crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Viewport height used when rendering headless previews.
const PREVIEW_VIEWPORT_HEIGHT: f64 = 900.0;

/// Everything the preview page needs to show one profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPayload {
    pub profile: VisionProfile,
    pub active: bool,
    pub stylesheet: String,
    pub slots: Vec<SlotSummary>,
    pub guide: Option<GuidePayload>,
    pub version: String,
}

/// One composition slot as shown in the side panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub name: String,
    pub marker: Option<String>,
    pub bytes: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidePayload {
    pub id: String,
    pub strip_height: f64,
    pub top_class: String,
    pub strip_class: String,
    pub bottom_class: String,
}

/// Run a full pass against a headless document and collect the result.
pub fn render_preview_payload(profile: &VisionProfile) -> Result<PreviewPayload, RenderError> {
    let mut renderer = AdaptiveRenderer::new(
        MemoryDocument::new(PREVIEW_VIEWPORT_HEIGHT),
        RendererOptions::default(),
    );
    renderer.apply(profile)?;

    let active = renderer.is_active();
    let stylesheet = renderer
        .document()
        .text_by_id(STYLE_ID)
        .unwrap_or_default()
        .to_string();

    let slots = if active {
        compose(profile)
            .iter()
            .map(|(slot, fragment)| SlotSummary {
                name: slot.name().to_string(),
                marker: match fragment {
                    StyleFragment::Marker(label) => Some((*label).to_string()),
                    StyleFragment::Rules(_) => None,
                },
                bytes: fragment.to_string().len(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let guide = (active && profile.reading_guide).then(|| GuidePayload {
        id: GUIDE_ID.to_string(),
        strip_height: strip_height(profile),
        top_class: TOP_CLASS.to_string(),
        strip_class: STRIP_CLASS.to_string(),
        bottom_class: BOTTOM_CLASS.to_string(),
    });

    Ok(PreviewPayload {
        profile: *profile,
        active,
        stylesheet,
        slots,
        guide,
        version: VERSION_MARKER.to_string(),
    })
}

/// Build the preview page around a serialized [`PreviewPayload`].
///
/// In server mode the page re-renders through `POST /api/render` when a
/// control changes.
pub fn build_preview_html(initial_payload_json: &str, server_mode: bool) -> String {
    let safe_json = initial_payload_json.replace("</", "<\\/");
    let server_mode_literal = if server_mode { "true" } else { "false" };

    let template = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>keratovision preview</title>
  <style id="kv-preview-chrome">
    .kv-panel {
      position: fixed;
      top: 12px;
      right: 12px;
      width: 260px;
      max-height: calc(100vh - 24px);
      overflow: auto;
      padding: 12px;
      font: 13px/1.4 system-ui, sans-serif;
      background: #fdfbf7;
      color: #252016;
      border: 1px solid #d7cebc;
      border-radius: 6px;
      box-shadow: 0 4px 18px rgba(28, 21, 9, 0.14);
      z-index: 2147483647;
    }
    .kv-panel label { display: flex; justify-content: space-between; gap: 8px; margin: 4px 0; }
    .kv-panel input[type=number] { width: 72px; }
    .kv-panel ul { padding-left: 16px; margin: 6px 0; }
    .kv-panel .marker { color: #675f50; }
    article { max-width: 42em; margin: 40px auto; padding: 0 24px; }
  </style>
  <style id="__STYLE_ID__"></style>
</head>
<body>
  <article>
    <h1>Reading with an irregular cornea</h1>
    <p>Keratoconus thins and steepens the cornea, so letters smear along one
    direction and pick up faint ghost images. Small type suffers first.</p>
    <h2>What the compensation does</h2>
    <p>Counter-shadows pull stroke energy back against the blur direction,
    contrast and spacing are raised with severity, and glare is capped by a
    brightness clamp. <a href="#">Links</a>, <em>emphasis</em> and
    <code>code</code> keep their meaning.</p>
    <h3>Smaller print</h3>
    <p><small>Footnotes and captions get a darker colour than body text.</small></p>
    <ul><li>List items</li><li>stay readable</li></ul>
    <blockquote>Long passages are easier with the reading guide enabled.</blockquote>
    <img alt="sample" width="160" height="90"
      src="data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' width='160' height='90'%3E%3Crect width='160' height='90' fill='%23226a52'/%3E%3C/svg%3E" />
  </article>

  <aside class="kv-panel" id="kv-panel">
    <strong>keratovision</strong> <span id="kv-version"></span>
    <div id="kv-status"></div>
    <form id="kv-controls"></form>
    <ul id="kv-slots"></ul>
  </aside>

  <script>
    const SERVER_MODE = __SERVER_MODE__;
    const DEBOUNCE_MS = 200;
    let payload = __INITIAL_PAYLOAD__;
    let guideHandler = null;
    let debounceTimer = null;

    const NUMBER_FIELDS = [
      ['astigmatAxis', 0, 180, 1],
      ['astigmatPower', 0, 6, 0.25],
      ['keratoSeverity', 0, 5, 0.5],
      ['fontSize', 16, 30, 1],
      ['luminanceClamp', 0.65, 1, 0.01],
      ['comaAngle', 0, 360, 5],
      ['comaIntensity', 0, 5, 0.5],
    ];
    const BOOL_FIELDS = [
      'enabled', 'polarityReversed', 'edgeEnhancement', 'readingGuide', 'chromaticCorrection',
    ];

    function applyPayload(next) {
      payload = next;
      document.getElementById('__STYLE_ID__').textContent = payload.stylesheet;
      document.getElementById('kv-version').textContent = 'v' + payload.version;
      document.getElementById('kv-status').textContent = payload.active ? 'active' : 'inactive';
      const slots = document.getElementById('kv-slots');
      slots.innerHTML = '';
      for (const slot of payload.slots) {
        const li = document.createElement('li');
        li.textContent = slot.marker ? slot.name + ': ' + slot.marker : slot.name + ' (' + slot.bytes + ' B)';
        if (slot.marker) li.className = 'marker';
        slots.appendChild(li);
      }
      syncGuide(payload.guide);
    }

    function syncGuide(guide) {
      if (guideHandler) {
        document.removeEventListener('mousemove', guideHandler);
        guideHandler = null;
      }
      let root = document.getElementById('__GUIDE_ID__');
      if (!guide) {
        if (root) root.remove();
        return;
      }
      if (!root) {
        root = document.createElement('div');
        root.id = guide.id;
        for (const cls of [guide.topClass, guide.stripClass, guide.bottomClass]) {
          const band = document.createElement('div');
          band.className = cls;
          root.appendChild(band);
        }
        document.body.appendChild(root);
      }
      const top = root.querySelector('.' + guide.topClass);
      const strip = root.querySelector('.' + guide.stripClass);
      const bottom = root.querySelector('.' + guide.bottomClass);
      const half = guide.stripHeight / 2;
      guideHandler = (e) => {
        const topHeight = Math.max(0, e.clientY - half);
        const bottomHeight = Math.max(0, window.innerHeight - e.clientY - half);
        if (top) top.style.height = topHeight + 'px';
        if (strip) strip.style.top = topHeight + 'px';
        if (bottom) bottom.style.height = bottomHeight + 'px';
      };
      document.addEventListener('mousemove', guideHandler, { passive: true });
    }

    function buildControls() {
      const form = document.getElementById('kv-controls');
      for (const [name, min, max, step] of NUMBER_FIELDS) {
        const label = document.createElement('label');
        label.textContent = name;
        const input = document.createElement('input');
        input.type = 'number';
        input.name = name;
        input.min = min;
        input.max = max;
        input.step = step;
        input.value = payload.profile[name];
        input.disabled = !SERVER_MODE;
        label.appendChild(input);
        form.appendChild(label);
      }
      for (const name of BOOL_FIELDS) {
        const label = document.createElement('label');
        label.textContent = name;
        const input = document.createElement('input');
        input.type = 'checkbox';
        input.name = name;
        input.checked = !!payload.profile[name];
        input.disabled = !SERVER_MODE;
        label.appendChild(input);
        form.appendChild(label);
      }
      form.addEventListener('input', () => {
        clearTimeout(debounceTimer);
        debounceTimer = setTimeout(rerender, DEBOUNCE_MS);
      });
    }

    function readProfile() {
      const form = document.getElementById('kv-controls');
      const profile = {};
      for (const [name] of NUMBER_FIELDS) profile[name] = Number(form.elements[name].value);
      for (const name of BOOL_FIELDS) profile[name] = form.elements[name].checked;
      return profile;
    }

    async function rerender() {
      if (!SERVER_MODE) return;
      try {
        const res = await fetch('/api/render', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify(readProfile()),
        });
        if (!res.ok) {
          document.getElementById('kv-status').textContent = 'render failed: ' + res.status;
          return;
        }
        applyPayload(await res.json());
      } catch (err) {
        document.getElementById('kv-status').textContent = 'render failed: ' + err;
      }
    }

    buildControls();
    applyPayload(payload);
  </script>
</body>
</html>
"##;

    template
        .replace("__INITIAL_PAYLOAD__", &safe_json)
        .replace("__SERVER_MODE__", server_mode_literal)
        .replace("__STYLE_ID__", STYLE_ID)
        .replace("__GUIDE_ID__", GUIDE_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_stylesheet_and_slots() {
        let payload = render_preview_payload(&VisionProfile::default()).expect("render");
        assert!(payload.active);
        assert_eq!(payload.stylesheet, compose(&VisionProfile::default()).to_css());
        assert_eq!(payload.slots.len(), 8);
        assert_eq!(payload.version, "2.1");
        assert!(payload.guide.is_none());
    }

    #[test]
    fn disabled_profile_previews_inactive() {
        let profile = VisionProfile {
            enabled: false,
            reading_guide: true,
            ..VisionProfile::default()
        };
        let payload = render_preview_payload(&profile).expect("render");
        assert!(!payload.active);
        assert!(payload.stylesheet.is_empty());
        assert!(payload.slots.is_empty());
        assert!(payload.guide.is_none());
    }

    #[test]
    fn guide_payload_uses_strip_height() {
        let profile = VisionProfile {
            reading_guide: true,
            font_size: 24.0,
            ..VisionProfile::default()
        };
        let guide = render_preview_payload(&profile)
            .expect("render")
            .guide
            .expect("guide payload");
        assert_eq!(guide.id, GUIDE_ID);
        assert_eq!(guide.strip_height, 52.8);
    }

    #[test]
    fn html_escapes_closing_tags_in_payload() {
        let html = build_preview_html(r#"{"stylesheet":"</style><script>"}"#, false);
        assert!(html.contains(r#"<\/style><script>"#));
        assert!(!html.contains("__INITIAL_PAYLOAD__"));
        assert!(html.contains("const SERVER_MODE = false;"));
        assert!(html.contains(r#"<style id="keratovision-adaptive">"#));
    }
}
