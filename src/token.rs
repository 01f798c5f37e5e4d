use nanoid::nanoid;

/// Alphabet for token ids. Restricted to characters that are inert in
/// markdown and HTML so a placeholder passes through the renderer untouched.
const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

const ID_LEN: usize = 16;

pub(crate) fn new_id() -> String {
    nanoid!(ID_LEN, &ID_ALPHABET)
}

/// One region of the input. The ordered token sequence reconstructs the
/// normalized input exactly: text tokens verbatim, math tokens through their
/// placeholder. Math markup fields are derived once at tokenization time and
/// never mutated afterwards.
#[derive(Clone, Debug)]
pub enum Token {
    Text {
        id: String,
        text: String,
    },
    Math {
        id: String,
        source_latex: String,
        display_mode: bool,
        /// KaTeX HTML for the screen preview.
        rendered_html: String,
        /// Standards-based markup (MathML).
        mathml: String,
        /// Office math markup (OMML fragment), derived from the MathML.
        omml: String,
    },
}

impl Token {
    pub fn id(&self) -> &str {
        match self {
            Token::Text { id, .. } | Token::Math { id, .. } => id,
        }
    }

    pub fn is_math(&self) -> bool {
        matches!(self, Token::Math { .. })
    }

    /// The marker substituted for this token during markdown processing.
    /// All placeholders have equal length and distinct ids, so no placeholder
    /// can be a substring of another.
    pub fn placeholder(&self) -> String {
        format!("mathtok{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_fixed_length_and_unique() {
        let ids: Vec<String> = (0..64).map(|_| new_id()).collect();
        for id in &ids {
            assert_eq!(id.len(), ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn placeholders_cannot_nest() {
        let a = Token::Text {
            id: new_id(),
            text: String::new(),
        };
        let b = Token::Text {
            id: new_id(),
            text: String::new(),
        };
        assert_eq!(a.placeholder().len(), b.placeholder().len());
        assert!(!a.placeholder().contains(&b.placeholder()));
    }
}
