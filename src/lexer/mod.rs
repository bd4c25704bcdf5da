use logos::{Logos, Span};

pub mod options;

/// Tokens of a single G-code block ("G1 X10 Y-2.5 F100")
///
/// Used to build commands from text. Words keep the raw digits of their
/// number so "G00" and "G0" stay distinct mnemonics.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
#[logos(error = LexerError)]
pub enum Token {
    // Letter followed by a number
    #[regex(r"[A-Za-z][+-]?([0-9]+\.?[0-9]*|\.[0-9]+)", word)]
    Word(Word),

    // Pseudo-commands such as `message`
    #[regex(r"[A-Za-z][A-Za-z_]+", |lex| lex.slice().to_string())]
    Ident(String),

    // Parenthesised comments
    #[regex(r"\([^)]*\)", |lex| lex.slice().to_string())]
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub letter: char,
    pub raw: String,
    pub value: f64,
}

fn word(lex: &mut logos::Lexer<Token>) -> Option<Word> {
    let mut chars = lex.slice().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let raw = chars.as_str();
    let value = raw.parse::<f64>().ok()?;
    Some(Word {
        letter,
        raw: raw.to_string(),
        value,
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexerError;

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lexer error")
    }
}

impl std::error::Error for LexerError {}

/// Lex the whole input, stopping at the first unreadable span
pub fn lex<'s, T>(input: &'s str) -> Result<Vec<(T, Span)>, Span>
where
    T: Logos<'s, Source = str, Error = LexerError>,
    T::Extras: Default,
{
    T::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(_) => Err(span),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(input: &str) -> Vec<Token> {
        lex::<Token>(input)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_motion_block() {
        assert_eq!(
            tokens("G1 X10 y-2.5 F.5"),
            vec![
                Token::Word(Word { letter: 'G', raw: "1".into(), value: 1.0 }),
                Token::Word(Word { letter: 'X', raw: "10".into(), value: 10.0 }),
                Token::Word(Word { letter: 'Y', raw: "-2.5".into(), value: -2.5 }),
                Token::Word(Word { letter: 'F', raw: ".5".into(), value: 0.5 }),
            ]
        );
    }

    #[test]
    fn test_packed_words() {
        let words: Vec<char> = tokens("G00X1Y2")
            .into_iter()
            .filter_map(|t| match t {
                Token::Word(w) => Some(w.letter),
                _ => None,
            })
            .collect();
        assert_eq!(words, vec!['G', 'X', 'Y']);
    }

    #[test]
    fn test_comment_and_ident() {
        assert_eq!(
            tokens("message (tool check)"),
            vec![
                Token::Ident("message".into()),
                Token::Comment("(tool check)".into()),
            ]
        );
    }

    #[test]
    fn test_error_span() {
        assert_eq!(lex::<Token>("G1 X10 #"), Err(7..8));
    }
}
