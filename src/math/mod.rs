pub mod omml;

use katex::{Opts, OutputType};
use latex2mathml::{latex_to_mathml, DisplayStyle};

/// The three cached representations derived from one formula.
#[derive(Clone, Debug)]
pub struct ConvertedMath {
    pub rendered_html: String,
    pub mathml: String,
    pub omml: String,
}

/// Converts one LaTeX formula into all three markup forms. Never fails: both
/// renderers run in permissive mode and a formula that still cannot be
/// rendered degrades to a literal fallback, so one bad span cannot abort the
/// surrounding document.
pub fn convert(latex: &str, display_mode: bool) -> ConvertedMath {
    let rendered_html = render_katex(latex, display_mode);
    let mathml = render_mathml(latex, display_mode);
    let omml = omml::mathml_to_omml(&mathml, display_mode)
        .unwrap_or_else(|_| omml::literal_omml(latex, display_mode));

    ConvertedMath {
        rendered_html,
        mathml,
        omml,
    }
}

fn render_katex(latex: &str, display_mode: bool) -> String {
    let rendered = Opts::builder()
        .display_mode(display_mode)
        .output_type(OutputType::Html)
        .throw_on_error(false)
        .build()
        .ok()
        .and_then(|opts| katex::render_with_opts(latex, opts).ok());

    match rendered {
        Some(html) => html,
        // Best-effort visual fallback, keeps the source readable on screen.
        None => format!(
            r#"<code class="math-fallback">{}</code>"#,
            html_escape(latex)
        ),
    }
}

fn render_mathml(latex: &str, display_mode: bool) -> String {
    let style = if display_mode {
        DisplayStyle::Block
    } else {
        DisplayStyle::Inline
    };

    match latex_to_mathml(latex, style) {
        Ok(mathml) => strip_parse_error_mtext(&mathml),
        Err(_) => {
            let display_attr = if display_mode { "block" } else { "inline" };
            format!(
                r#"<math xmlns="http://www.w3.org/1998/Math/MathML" display="{display_attr}"><mtext>{}</mtext></math>"#,
                xml_escape(latex)
            )
        }
    }
}

/// latex2mathml marks unsupported commands with an inline
/// `<mtext>[PARSE ERROR: ..]</mtext>` node while still emitting useful MathML
/// for the remaining tokens. The marker must not leak into Word output.
fn strip_parse_error_mtext(mathml: &str) -> String {
    const START: &str = "<mtext>[PARSE ERROR:";
    const END: &str = "</mtext>";

    let mut out = mathml.to_string();
    while let Some(s) = out.find(START) {
        let Some(e_rel) = out[s..].find(END) else {
            break;
        };
        out.replace_range(s..s + e_rel + END.len(), "");
    }
    out
}

pub(crate) fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn html_escape(s: &str) -> String {
    xml_escape(s)
}
