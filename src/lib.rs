//! mathdown converts mixed markdown/LaTeX text into Word-friendly output.
//!
//! The input is split into alternating text and `$`-delimited math regions.
//! Each math region is rendered once into three forms (KaTeX HTML for the
//! screen preview, MathML, and Office math markup), then the token sequence
//! is woven back into HTML documents or a binary docx package.

pub mod accents;
pub mod docx;
pub mod export;
pub mod math;
pub mod segment;
pub mod token;
pub mod weave;

use crate::segment::Segment;
use crate::token::Token;

/// Splits the input into a token sequence, converting every math region into
/// its cached markup forms. Accent macros are normalized over the whole input
/// first, so both text and formulas see the substituted characters.
pub fn tokenize(input: &str) -> Vec<Token> {
    let normalized = accents::normalize_accents(input);

    segment::segment(&normalized)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) => Token::Text {
                id: token::new_id(),
                text,
            },
            Segment::Latex { content, display } => {
                let converted = math::convert(&content, display);
                Token::Math {
                    id: token::new_id(),
                    source_latex: content,
                    display_mode: display,
                    rendered_html: converted.rendered_html,
                    mathml: converted.mathml,
                    omml: converted.omml,
                }
            }
        })
        .collect()
}

/// The full set of outputs derived from one input text.
pub struct Conversion {
    pub tokens: Vec<Token>,
    /// HTML fragment for the screen preview, math rendered by KaTeX.
    pub preview_html: String,
    /// Full HTML document with OMML math, suited for pasting into Word.
    pub word_html: String,
    /// Binary docx package.
    pub docx: Vec<u8>,
}

impl Conversion {
    pub fn run(input: &str) -> anyhow::Result<Conversion> {
        let tokens = tokenize(input);
        let preview_html = weave::preview_html(&tokens);
        let word_html = weave::word_html(&tokens);
        let document = docx::build_document(&tokens);
        let docx = docx::package::write_docx(&document)?;

        Ok(Conversion {
            tokens,
            preview_html,
            word_html,
            docx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_alternates_text_and_math() {
        let tokens = tokenize("a $x$ b");
        assert_eq!(tokens.len(), 3);
        assert!(!tokens[0].is_math());
        assert!(tokens[1].is_math());
        assert!(!tokens[2].is_math());
    }

    #[test]
    fn accents_are_normalized_before_segmentation() {
        let tokens = tokenize(r"value \hat{a} and $\hat{e}$");
        match &tokens[0] {
            Token::Text { text, .. } => assert!(text.contains('â')),
            _ => panic!("expected text token"),
        }
        match &tokens[1] {
            Token::Math { source_latex, .. } => assert_eq!(source_latex, "ê"),
            _ => panic!("expected math token"),
        }
    }

    #[test]
    fn math_tokens_carry_all_three_representations() {
        let tokens = tokenize(r"$\frac{1}{2}$");
        match &tokens[0] {
            Token::Math {
                rendered_html,
                mathml,
                omml,
                display_mode,
                ..
            } => {
                assert!(!display_mode);
                assert!(rendered_html.contains("katex"));
                assert!(mathml.contains("<mfrac>"));
                assert!(omml.contains("<m:f>"));
            }
            _ => panic!("expected math token"),
        }
    }

    #[test]
    fn conversion_produces_every_output() {
        let c = Conversion::run("# T\n\nbody $x^2$").unwrap();
        assert!(c.preview_html.contains("<h1>T</h1>"));
        assert!(c.word_html.contains("<m:oMath>"));
        assert_eq!(&c.docx[..2], b"PK");
    }
}
