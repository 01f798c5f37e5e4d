//! MathML → Office math markup (OMML) transformation.
//!
//! The Office dialect is what Word's equation editor consumes natively; the
//! translation covers the node kinds latex2mathml emits (runs, fractions,
//! scripts, radicals, under/over limits, tables, fences). Unrecognized
//! elements degrade to their children so a partially understood formula still
//! produces usable output.

use crate::math::xml_escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MathmlError {
    #[error("malformed MathML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("missing <math> root element")]
    MissingRoot,
}

#[derive(Debug)]
struct MmlElement {
    name: String,
    children: Vec<MmlNode>,
}

#[derive(Debug)]
enum MmlNode {
    Element(MmlElement),
    Text(String),
}

/// Transforms a MathML fragment into an OMML fragment. `display` selects the
/// standalone paragraph form (`m:oMathPara`) over the inline form.
pub fn mathml_to_omml(mathml: &str, display: bool) -> Result<String, MathmlError> {
    let root = parse_mathml(mathml)?;
    let mut body = String::new();
    for child in &root.children {
        emit(child, &mut body);
    }
    Ok(wrap_omath(&body, display))
}

/// OMML for a formula that could not be converted: a single literal text run.
pub fn literal_omml(latex: &str, display: bool) -> String {
    let body = format!("<m:r><m:t>{}</m:t></m:r>", xml_escape(latex));
    wrap_omath(&body, display)
}

fn wrap_omath(body: &str, display: bool) -> String {
    if display {
        format!("<m:oMathPara><m:oMath>{body}</m:oMath></m:oMathPara>")
    } else {
        format!("<m:oMath>{body}</m:oMath>")
    }
}

/// If the fragment carries no math structure beyond text runs, returns the
/// concatenated run text. Used to collapse trivial formulas (a bare variable
/// or number) into ordinary styled text instead of a math object.
pub fn omml_plain_text(omml: &str) -> Option<String> {
    let mut reader = Reader::from_str(omml);
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                match e.local_name().as_ref() {
                    b"oMath" | b"oMathPara" | b"r" | b"t" => {}
                    _ => return None,
                }
            }
            Ok(Event::Text(e)) => text.push_str(&e.unescape().ok()?),
            Ok(Event::End(_)) => {}
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }

    Some(text)
}

fn parse_mathml(mathml: &str) -> Result<MmlElement, MathmlError> {
    let mut reader = Reader::from_str(mathml);
    reader.trim_text(true);

    let mut stack: Vec<MmlElement> = Vec::new();
    let mut root: Option<MmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(MmlElement {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    children: Vec::new(),
                });
            }
            Event::Empty(e) => {
                let el = MmlElement {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    children: Vec::new(),
                };
                attach(&mut stack, &mut root, el);
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(MmlNode::Text(e.unescape()?.into_owned()));
                }
            }
            Event::End(_) => {
                let el = stack.pop().ok_or(MathmlError::MissingRoot)?;
                attach(&mut stack, &mut root, el);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match root {
        Some(el) if el.name == "math" => Ok(el),
        _ => Err(MathmlError::MissingRoot),
    }
}

fn attach(stack: &mut Vec<MmlElement>, root: &mut Option<MmlElement>, el: MmlElement) {
    // KaTeX-style source annotations carry raw TeX; they must not leak into
    // the Office output.
    if el.name == "annotation" {
        return;
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(MmlNode::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

fn emit(node: &MmlNode, out: &mut String) {
    match node {
        MmlNode::Text(t) => push_run(t, out),
        MmlNode::Element(el) => emit_element(el, out),
    }
}

fn emit_element(el: &MmlElement, out: &mut String) {
    match el.name.as_str() {
        "mi" | "mn" | "mo" | "mtext" | "ms" => push_run(&text_content(el), out),
        "mspace" => push_run(" ", out),
        "mfrac" if el.children.len() == 2 => {
            out.push_str("<m:f><m:num>");
            emit(&el.children[0], out);
            out.push_str("</m:num><m:den>");
            emit(&el.children[1], out);
            out.push_str("</m:den></m:f>");
        }
        "msup" if el.children.len() == 2 => {
            script(out, "m:sSup", &el.children[0], &[("m:sup", &el.children[1])]);
        }
        "msub" if el.children.len() == 2 => {
            script(out, "m:sSub", &el.children[0], &[("m:sub", &el.children[1])]);
        }
        "msubsup" if el.children.len() == 3 => {
            script(
                out,
                "m:sSubSup",
                &el.children[0],
                &[("m:sub", &el.children[1]), ("m:sup", &el.children[2])],
            );
        }
        "msqrt" => {
            out.push_str("<m:rad><m:radPr><m:degHide m:val=\"1\"/></m:radPr><m:deg/><m:e>");
            emit_children(el, out);
            out.push_str("</m:e></m:rad>");
        }
        "mroot" if el.children.len() == 2 => {
            out.push_str("<m:rad><m:deg>");
            emit(&el.children[1], out);
            out.push_str("</m:deg><m:e>");
            emit(&el.children[0], out);
            out.push_str("</m:e></m:rad>");
        }
        "mover" if el.children.len() == 2 => {
            limit(out, "m:limUpp", &el.children[0], &el.children[1]);
        }
        "munder" if el.children.len() == 2 => {
            limit(out, "m:limLow", &el.children[0], &el.children[1]);
        }
        "munderover" if el.children.len() == 3 => {
            let mut inner = String::new();
            limit(&mut inner, "m:limLow", &el.children[0], &el.children[1]);
            out.push_str("<m:limUpp><m:e>");
            out.push_str(&inner);
            out.push_str("</m:e><m:lim>");
            emit(&el.children[2], out);
            out.push_str("</m:lim></m:limUpp>");
        }
        "mtable" => {
            out.push_str("<m:m>");
            for row in &el.children {
                if let MmlNode::Element(row_el) = row {
                    out.push_str("<m:mr>");
                    for cell in &row_el.children {
                        out.push_str("<m:e>");
                        emit(cell, out);
                        out.push_str("</m:e>");
                    }
                    out.push_str("</m:mr>");
                }
            }
            out.push_str("</m:m>");
        }
        "mfenced" => {
            out.push_str("<m:d>");
            for child in &el.children {
                out.push_str("<m:e>");
                emit(child, out);
                out.push_str("</m:e>");
            }
            out.push_str("</m:d>");
        }
        // Grouping and presentation wrappers contribute only their content.
        _ => emit_children(el, out),
    }
}

fn emit_children(el: &MmlElement, out: &mut String) {
    for child in &el.children {
        emit(child, out);
    }
}

fn script(out: &mut String, tag: &str, base: &MmlNode, parts: &[(&str, &MmlNode)]) {
    out.push('<');
    out.push_str(tag);
    out.push_str("><m:e>");
    emit(base, out);
    out.push_str("</m:e>");
    for (part_tag, node) in parts {
        out.push('<');
        out.push_str(part_tag);
        out.push('>');
        emit(node, out);
        out.push_str("</");
        out.push_str(part_tag);
        out.push('>');
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn limit(out: &mut String, tag: &str, base: &MmlNode, bound: &MmlNode) {
    out.push('<');
    out.push_str(tag);
    out.push_str("><m:e>");
    emit(base, out);
    out.push_str("</m:e><m:lim>");
    emit(bound, out);
    out.push_str("</m:lim></");
    out.push_str(tag);
    out.push('>');
}

fn push_run(text: &str, out: &mut String) {
    if text.is_empty() {
        return;
    }
    out.push_str("<m:r><m:t>");
    out.push_str(&xml_escape(text));
    out.push_str("</m:t></m:r>");
}

fn text_content(el: &MmlElement) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    out
}

fn collect_text(el: &MmlElement, out: &mut String) {
    for child in &el.children {
        match child {
            MmlNode::Text(t) => out.push_str(t),
            MmlNode::Element(inner) => collect_text(inner, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn omml(mathml: &str) -> String {
        mathml_to_omml(mathml, false).unwrap()
    }

    #[test]
    fn bare_identifier_is_a_text_run() {
        assert_eq!(
            omml("<math><mi>x</mi></math>"),
            "<m:oMath><m:r><m:t>x</m:t></m:r></m:oMath>"
        );
    }

    #[test]
    fn fraction() {
        assert_eq!(
            omml("<math><mfrac><mn>1</mn><mn>2</mn></mfrac></math>"),
            "<m:oMath><m:f><m:num><m:r><m:t>1</m:t></m:r></m:num>\
             <m:den><m:r><m:t>2</m:t></m:r></m:den></m:f></m:oMath>"
        );
    }

    #[test]
    fn superscript() {
        let out = omml("<math><msup><mi>x</mi><mn>2</mn></msup></math>");
        assert!(out.contains("<m:sSup><m:e><m:r><m:t>x</m:t></m:r></m:e>"));
        assert!(out.contains("<m:sup><m:r><m:t>2</m:t></m:r></m:sup>"));
    }

    #[test]
    fn square_root_hides_degree() {
        let out = omml("<math><msqrt><mi>a</mi></msqrt></math>");
        assert!(out.contains("<m:degHide m:val=\"1\"/>"));
        assert!(out.contains("<m:e><m:r><m:t>a</m:t></m:r></m:e>"));
    }

    #[test]
    fn display_wraps_in_omathpara() {
        let out = mathml_to_omml("<math><mi>x</mi></math>", true).unwrap();
        assert!(out.starts_with("<m:oMathPara><m:oMath>"));
        assert!(out.ends_with("</m:oMath></m:oMathPara>"));
    }

    #[test]
    fn annotation_content_is_dropped() {
        let out = omml(
            "<math><semantics><mrow><mi>y</mi></mrow>\
             <annotation encoding=\"application/x-tex\">y</annotation></semantics></math>",
        );
        assert_eq!(out, "<m:oMath><m:r><m:t>y</m:t></m:r></m:oMath>");
    }

    #[test]
    fn text_is_escaped() {
        let out = literal_omml("a<b", false);
        assert_eq!(out, "<m:oMath><m:r><m:t>a&lt;b</m:t></m:r></m:oMath>");
    }

    #[test]
    fn plain_text_probe_accepts_runs_only() {
        assert_eq!(
            omml_plain_text("<m:oMath><m:r><m:t>x</m:t></m:r></m:oMath>"),
            Some("x".to_string())
        );
        assert_eq!(
            omml_plain_text(
                "<m:oMath><m:f><m:num><m:r><m:t>1</m:t></m:r></m:num>\
                 <m:den><m:r><m:t>2</m:t></m:r></m:den></m:f></m:oMath>"
            ),
            None
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(mathml_to_omml("<mrow><mi>x</mi></mrow>", false).is_err());
        assert!(mathml_to_omml("not xml at all", false).is_err());
    }
}
