//! Standalone preview document assembly.
//!
//! The generation pipeline writes `index.html`, `style.css` and
//! `script.js` plus a hero image saved as [`IMAGE_PLACEHOLDER`]. A preview
//! has no file system to resolve those names against, so the CSS and JS
//! are inlined and the image file name is replaced by the actual image
//! data.

use std::sync::LazyLock;

use lpgen_core::GenerationResult;
use regex::Regex;

/// File name the pipeline uses for the generated hero image.
pub const IMAGE_PLACEHOLDER: &str = "placeholder_css_1.jpg";

/// Icon library the generated pages rely on.
pub const LUCIDE_SCRIPT_URL: &str = "https://unpkg.com/lucide@latest/dist/umd/lucide.min.js";

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").expect("valid regex"));

static STYLE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link\b[^>]*href\s*=\s*["'](?:\./)?style\.css["'][^>]*>\s*"#)
        .expect("valid regex")
});

static SCRIPT_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*src\s*=\s*["'](?:\./)?script\.js["'][^>]*>\s*</script\s*>\s*"#)
        .expect("valid regex")
});

static STYLE_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(style)").expect("valid regex"));

static SCRIPT_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(script)").expect("valid regex"));

/// Document-level settings for a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// `lang` attribute of the root element (default: `ja`).
    pub lang: String,
    /// Document title (default: `LP Preview`).
    pub title: String,
    /// External icon library loaded before the generated script runs.
    /// `None` skips both the `<script src>` and the icon initialisation.
    pub icon_script: Option<String>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            lang: "ja".to_string(),
            title: "LP Preview".to_string(),
            icon_script: Some(LUCIDE_SCRIPT_URL.to_string()),
        }
    }
}

/// Build the standalone preview document for a generated result.
pub fn build_document(result: &GenerationResult, options: &DocumentOptions) -> String {
    let image = result.image_source();
    let has_placeholder =
        result.css.contains(IMAGE_PLACEHOLDER) || result.html.contains(IMAGE_PLACEHOLDER);
    if image.is_none() && has_placeholder {
        tracing::debug!("Result has no image data; placeholder left unresolved");
    }

    let css = escape_closing_tag(&substitute_image(&result.css, image), &STYLE_CLOSE_RE);
    let js = escape_closing_tag(&result.js, &SCRIPT_CLOSE_RE);
    let body = strip_bundle_references(body_content(&result.html));
    let body = substitute_image(&body, image);

    let (icon_tag, icon_init) = match &options.icon_script {
        Some(src) => (
            format!("<script src=\"{}\"></script>\n", escape_attribute(src)),
            "\nif (typeof lucide !== 'undefined' && typeof lucide.createIcons === 'function') {\n  lucide.createIcons();\n}\n",
        ),
        None => (String::new(), ""),
    };

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"{lang}\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n\
         <style>\n{css}\n</style>\n\
         {icon_tag}\
         </head>\n\
         <body>\n\
         {body}\n\
         <script>\n{js}\n{icon_init}</script>\n\
         </body>\n\
         </html>\n",
        lang = escape_attribute(&options.lang),
        title = escape_text(&options.title),
    )
}

/// Replace every occurrence of [`IMAGE_PLACEHOLDER`] with `image`.
///
/// Leaves `source` unchanged when there is no image.
pub fn substitute_image(source: &str, image: Option<&str>) -> String {
    match image {
        Some(image) => source.replace(IMAGE_PLACEHOLDER, image),
        None => source.to_string(),
    }
}

/// Inner content of `<body>` when `html` is a full document, else `html`
/// itself.
fn body_content(html: &str) -> &str {
    BODY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(html)
}

/// Drop `<link href="style.css">` and `<script src="script.js">`; both files
/// are inlined into the preview.
fn strip_bundle_references(html: &str) -> String {
    let html = STYLE_LINK_RE.replace_all(html, "");
    SCRIPT_SRC_RE.replace_all(&html, "").into_owned()
}

/// Turn `</style` / `</script` into `<\/style` / `<\/script` so generated
/// code cannot close its own block early.
fn escape_closing_tag(code: &str, re: &Regex) -> String {
    re.replace_all(code, r"<\/$1").into_owned()
}

/// Escape a string for use inside a double-quoted HTML attribute.
pub(crate) fn escape_attribute(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
