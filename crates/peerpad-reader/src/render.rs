//! HTML page rendering.

use crate::error::RenderError;
use pulldown_cmark::{html, Options, Parser};
use std::sync::Arc;

/// Stylesheet inlined into every page.
pub const STYLESHEET: &str = include_str!("../static/page.css");

/// Markdown to HTML conversion.
pub trait MarkdownConverter: Send + Sync {
    fn convert(&self, markdown: &str) -> Result<String, RenderError>;
}

/// CommonMark with the GitHub-style extensions pads commonly use.
#[derive(Debug, Clone, Copy)]
pub struct CommonMark {
    options: Options,
}

impl Default for CommonMark {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES,
        }
    }
}

impl MarkdownConverter for CommonMark {
    fn convert(&self, markdown: &str) -> Result<String, RenderError> {
        let parser = Parser::new_ext(markdown, self.options);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

/// Builds complete pages. Nothing is cached; every call renders afresh.
#[derive(Clone)]
pub struct Renderer {
    converter: Arc<dyn MarkdownConverter>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Arc::new(CommonMark::default()))
    }
}

impl Renderer {
    pub fn new(converter: Arc<dyn MarkdownConverter>) -> Self {
        Self { converter }
    }

    /// Render `body` (markdown) under `title`.
    ///
    /// A conversion failure does not fail the page; the error is shown in
    /// place of the body.
    pub fn render(&self, title: &str, body: &str) -> String {
        let article = match self.converter.convert(body) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Markdown conversion failed: {}", e);
                format!("<pre class=\"render-error\">{}</pre>\n", escape_html(&e.to_string()))
            }
        };

        format!(
            "<!DOCTYPE html>\n\
             <html>\n\
             <head>\n\
             <meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{title}</title>\n\
             <style>\n{css}</style>\n\
             </head>\n\
             <body>\n\
             <article class=\"markdown-body\">\n{article}</article>\n\
             </body>\n\
             </html>\n",
            title = escape_html(title),
            css = STYLESHEET,
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    pulldown_cmark_escape::escape_html(&mut out, text).expect("writing to a String cannot fail");
    out
}
