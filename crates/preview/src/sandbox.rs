//! Sandboxed frame embedding.
//!
//! The preview document is handed to an `<iframe srcdoc>` whose `sandbox`
//! attribute is derived from a [`SandboxPolicy`]. Without
//! `allow-same-origin` the frame runs in an opaque origin: scripts execute,
//! but `document.cookie`, `localStorage` and the parent's DOM are out of
//! reach.

use serde::{Deserialize, Serialize};

use crate::document::escape_attribute;

/// Capabilities granted to the generated page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxPolicy {
    pub allow_scripts: bool,
    pub allow_same_origin: bool,
    pub allow_forms: bool,
    pub allow_popups: bool,
    pub allow_modals: bool,
    pub allow_top_navigation: bool,
}

impl Default for SandboxPolicy {
    /// Scripts only.
    fn default() -> Self {
        Self {
            allow_scripts: true,
            allow_same_origin: false,
            allow_forms: false,
            allow_popups: false,
            allow_modals: false,
            allow_top_navigation: false,
        }
    }
}

impl SandboxPolicy {
    /// Value of the iframe `sandbox` attribute. An empty string is the
    /// most restrictive sandbox.
    pub fn attribute(&self) -> String {
        let flags = [
            (self.allow_scripts, "allow-scripts"),
            (self.allow_same_origin, "allow-same-origin"),
            (self.allow_forms, "allow-forms"),
            (self.allow_popups, "allow-popups"),
            (self.allow_modals, "allow-modals"),
            (self.allow_top_navigation, "allow-top-navigation"),
        ];
        flags
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, flag)| *flag)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `false` when the frame could reach the host page: scripts combined
    /// with same-origin can remove the sandbox attribute, and top
    /// navigation lets the page replace the host.
    pub fn is_isolated(&self) -> bool {
        !(self.allow_scripts && self.allow_same_origin) && !self.allow_top_navigation
    }
}

/// Preview viewport presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    #[default]
    Desktop,
    Mobile,
}

impl Viewport {
    /// CSS width of the frame.
    pub fn width(self) -> &'static str {
        match self {
            Self::Desktop => "100%",
            Self::Mobile => "375px",
        }
    }

    pub fn height(self) -> &'static str {
        match self {
            Self::Desktop => "800px",
            Self::Mobile => "667px",
        }
    }
}

impl std::str::FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            other => Err(format!("unknown viewport: {other}")),
        }
    }
}

/// `<iframe>` markup embedding `document` under `policy`.
pub fn embed_frame(document: &str, title: &str, policy: &SandboxPolicy, viewport: Viewport) -> String {
    if !policy.is_isolated() {
        tracing::warn!(
            sandbox = %policy.attribute(),
            "Preview sandbox lets generated code reach the host page",
        );
    }

    format!(
        "<iframe title=\"{title}\" sandbox=\"{sandbox}\" referrerpolicy=\"no-referrer\" \
         style=\"width: {width}; height: {height}; border: 0;\" srcdoc=\"{srcdoc}\"></iframe>",
        title = escape_attribute(title),
        sandbox = policy.attribute(),
        width = viewport.width(),
        height = viewport.height(),
        srcdoc = escape_attribute(document),
    )
}

/// Minimal host page around a sandboxed frame.
pub fn host_page(frame: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <title>{title}</title>\n\
         <style>body {{ margin: 0; display: flex; justify-content: center; background: #f3f4f6; }}</style>\n\
         </head>\n\
         <body>\n\
         {frame}\n\
         </body>\n\
         </html>\n",
        title = escape_attribute(title),
    )
}
