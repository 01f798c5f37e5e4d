use crate::token::Token;
use pulldown_cmark::{html, Options, Parser};

/// Builds the combined markdown source with math regions replaced by their
/// placeholders. With `display_breaks`, a display-mode placeholder is wrapped
/// in blank lines so the markdown renderer treats it as a standalone block;
/// the document builder re-derives the same string without the breaks so a
/// display formula stays inside its surrounding paragraph.
pub fn combined_source(tokens: &[Token], display_breaks: bool) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text { text, .. } => out.push_str(text),
            Token::Math { display_mode, .. } => {
                if *display_mode && display_breaks {
                    out.push_str("\n\n");
                    out.push_str(&token.placeholder());
                    out.push_str("\n\n");
                } else {
                    out.push_str(&token.placeholder());
                }
            }
        }
    }
    out
}

/// Renders the token sequence to HTML: markdown over the placeholder string,
/// then every placeholder occurrence replaced with `math_renderer(token)`.
/// Substitution is exhaustive; no placeholder survives in the output.
pub fn weave<F>(tokens: &[Token], math_renderer: F) -> String
where
    F: Fn(&Token) -> String,
{
    let source = combined_source(tokens, true);

    let parser = Parser::new_ext(&source, Options::empty());
    let mut rendered = String::new();
    html::push_html(&mut rendered, parser);

    for token in tokens {
        if token.is_math() {
            rendered = rendered.replace(&token.placeholder(), &math_renderer(token));
        }
    }
    rendered
}

/// Screen preview: an HTML fragment with KaTeX-rendered math in a `<div>`
/// (display) or `<span>` (inline) wrapper.
pub fn preview_html(tokens: &[Token]) -> String {
    weave(tokens, |token| match token {
        Token::Math {
            rendered_html,
            display_mode,
            ..
        } => {
            if *display_mode {
                format!(r#"<div class="math-display">{rendered_html}</div>"#)
            } else {
                format!(r#"<span class="math-inline">{rendered_html}</span>"#)
            }
        }
        Token::Text { .. } => String::new(),
    })
}

/// Word-paste output: a full HTML document declaring the Office math
/// namespace, with OMML fragments in place of math spans (`<div>`-wrapped
/// when display).
pub fn word_html(tokens: &[Token]) -> String {
    let body = weave(tokens, |token| match token {
        Token::Math {
            omml, display_mode, ..
        } => {
            if *display_mode {
                format!("<div>{omml}</div>")
            } else {
                omml.clone()
            }
        }
        Token::Text { .. } => String::new(),
    });

    format!(
        "<html xmlns:m=\"http://schemas.openxmlformats.org/officeDocument/2006/math\">\
         <head><meta charset=\"utf-8\"></head><body>{body}</body></html>"
    )
}
