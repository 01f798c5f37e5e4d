use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Block form first: `$$` always opens a block delimiter, never two empty
    // inline expressions. Block content may span lines; inline content may
    // not, and stops at the first closing `$`.
    static ref MATH_RE: Regex =
        Regex::new(r"(?s)\$\$(.+?)\$\$|\$([^$\n]+?)\$").expect("math span pattern");
}

/// One region of raw input as found by the scanner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Latex { content: String, display: bool },
}

/// Scans left to right for math spans and returns the ordered region list.
/// Unterminated delimiters never match; their text stays literal. Zero-length
/// text runs at boundaries are omitted.
pub fn segment(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in MATH_RE.captures_iter(text) {
        let m = caps.get(0).expect("whole match");
        if m.start() > last {
            out.push(Segment::Text(text[last..m.start()].to_string()));
        }
        if let Some(block) = caps.get(1) {
            out.push(Segment::Latex {
                content: block.as_str().to_string(),
                display: true,
            });
        } else if let Some(inline) = caps.get(2) {
            out.push(Segment::Latex {
                content: inline.as_str().to_string(),
                display: false,
            });
        }
        last = m.end();
    }

    if last < text.len() {
        out.push(Segment::Text(text[last..].to_string()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text_is_one_segment() {
        assert_eq!(
            segment("no math here"),
            vec![Segment::Text("no math here".to_string())]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(segment(""), Vec::new());
    }

    #[test]
    fn inline_span() {
        assert_eq!(
            segment("a $x+1$ b"),
            vec![
                Segment::Text("a ".to_string()),
                Segment::Latex {
                    content: "x+1".to_string(),
                    display: false,
                },
                Segment::Text(" b".to_string()),
            ]
        );
    }

    #[test]
    fn block_span_keeps_exact_content() {
        assert_eq!(
            segment("$$ x = y $$"),
            vec![Segment::Latex {
                content: " x = y ".to_string(),
                display: true,
            }]
        );
    }

    #[test]
    fn block_content_may_span_lines() {
        let segs = segment("$$a \\\\\nb$$");
        assert_eq!(
            segs,
            vec![Segment::Latex {
                content: "a \\\\\nb".to_string(),
                display: true,
            }]
        );
    }

    #[test]
    fn double_dollar_is_never_two_empty_inlines() {
        // `$$x$$` must parse as one block, not `$ $` pairs.
        let segs = segment("$$x$$");
        assert_eq!(
            segs,
            vec![Segment::Latex {
                content: "x".to_string(),
                display: true,
            }]
        );
    }

    #[test]
    fn unterminated_inline_stays_literal() {
        assert_eq!(
            segment("price is $5 today"),
            vec![Segment::Text("price is $5 today".to_string())]
        );
    }

    #[test]
    fn unterminated_block_stays_literal() {
        assert_eq!(
            segment("$$x = y"),
            vec![Segment::Text("$$x = y".to_string())]
        );
    }

    #[test]
    fn inline_cannot_cross_newline() {
        assert_eq!(
            segment("a $x\ny$ b"),
            vec![Segment::Text("a $x\ny$ b".to_string())]
        );
    }

    #[test]
    fn mixed_block_and_inline() {
        let segs = segment("intro $$A$$ mid $b$ end");
        assert_eq!(
            segs,
            vec![
                Segment::Text("intro ".to_string()),
                Segment::Latex {
                    content: "A".to_string(),
                    display: true,
                },
                Segment::Text(" mid ".to_string()),
                Segment::Latex {
                    content: "b".to_string(),
                    display: false,
                },
                Segment::Text(" end".to_string()),
            ]
        );
    }
}
