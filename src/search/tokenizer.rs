//! Lexer of the search query language

use crate::error::{BiletoError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    And,
    Or,
    Not,
    /// `name:value[,value...]`
    Qualifier { name: String, values: Vec<String> },
    /// Free text, bare or quoted
    Text(String),
    /// `#42`
    Number(u64),
}

/// A token with the character offset it starts at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Read a `"..."` string, the opening quote being the current character
    fn quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) => value.push(c),
                    None => break,
                },
                Some('"') => return Ok(value),
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(BiletoError::query(start, "unterminated quoted string"))
    }

    /// Read a bare word up to whitespace, a parenthesis or one of `stops`
    fn bare(&mut self, stops: &[char]) -> String {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || stops.contains(&c) {
                break;
            }
            value.push(c);
            self.pos += 1;
        }
        value
    }

    /// Read the comma-separated values of a qualifier
    fn qualifier_values(&mut self, name: &str, start: usize) -> Result<Vec<String>> {
        let mut values = Vec::new();
        loop {
            let value = if self.peek() == Some('"') {
                self.quoted()?
            } else {
                self.bare(&[','])
            };
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(BiletoError::query(
                    start,
                    format!("qualifier '{name}' expects a value"),
                ));
            }
            values.push(value);
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                return Ok(values);
            }
        }
    }

    /// Read a word, which may turn out to be a keyword, a ticket number or a qualifier
    fn word(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        let word = self.bare(&[':']);

        if self.peek() == Some(':') && is_qualifier_name(&word) {
            self.pos += 1;
            let values = self.qualifier_values(&word, start)?;
            return Ok(TokenKind::Qualifier {
                name: word.to_lowercase(),
                values,
            });
        }

        // Not a qualifier: the colon is part of the text
        let mut word = word;
        if self.peek() == Some(':') {
            word.push_str(&self.bare(&[]));
        }

        if let Some(number) = word.strip_prefix('#').and_then(|n| n.parse::<u64>().ok()) {
            return Ok(TokenKind::Number(number));
        }

        Ok(match word.to_uppercase().as_str() {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            _ => TokenKind::Text(word),
        })
    }
}

fn is_qualifier_name(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic() || c == '_')
}

/// Split a query into tokens
pub fn tokenize(query: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer {
        chars: query.chars().collect(),
        pos: 0,
    };
    let mut tokens = Vec::new();

    loop {
        lexer.skip_whitespace();
        let position = lexer.pos;
        let Some(c) = lexer.peek() else {
            break;
        };

        let kind = match c {
            '(' => {
                lexer.pos += 1;
                TokenKind::OpenParen
            },
            ')' => {
                lexer.pos += 1;
                TokenKind::CloseParen
            },
            '-' if lexer.peek_at(1).is_some_and(|n| !n.is_whitespace() && n != ')') => {
                lexer.pos += 1;
                TokenKind::Not
            },
            '"' => TokenKind::Text(lexer.quoted()?),
            _ => lexer.word()?,
        };
        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(query: &str) -> Vec<TokenKind> {
        tokenize(query).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn text(s: &str) -> TokenKind {
        TokenKind::Text(s.to_string())
    }

    fn qualifier(name: &str, values: &[&str]) -> TokenKind {
        TokenKind::Qualifier {
            name: name.to_string(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    #[test]
    fn test_words_and_keywords() {
        assert_eq!(
            kinds("printer and (scanner OR fax) NOT paper"),
            vec![
                text("printer"),
                TokenKind::And,
                TokenKind::OpenParen,
                text("scanner"),
                TokenKind::Or,
                text("fax"),
                TokenKind::CloseParen,
                TokenKind::Not,
                text("paper"),
            ]
        );
    }

    #[test]
    fn test_qualifiers() {
        assert_eq!(
            kinds("status:open,pending org:\"Acme Corp\" Assignee:@me"),
            vec![
                qualifier("status", &["open", "pending"]),
                qualifier("org", &["Acme Corp"]),
                qualifier("assignee", &["@me"]),
            ]
        );
    }

    #[test]
    fn test_negation_and_numbers() {
        assert_eq!(
            kinds("-label:spam #42 - #x"),
            vec![
                TokenKind::Not,
                qualifier("label", &["spam"]),
                TokenKind::Number(42),
                text("-"),
                text("#x"),
            ]
        );
    }

    #[test]
    fn test_quoted_text() {
        assert_eq!(
            kinds(r#""blue screen" "say \"hi\"" "AND""#),
            vec![text("blue screen"), text("say \"hi\""), text("AND")]
        );
    }

    #[test]
    fn test_text_with_colon_is_not_a_qualifier() {
        assert_eq!(kinds("\"http://intranet\""), vec![text("http://intranet")]);
        assert_eq!(kinds("10:30"), vec![text("10:30")]);
        assert_eq!(kinds("a:b"), vec![qualifier("a", &["b"])]);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("  a  (b)").unwrap();
        let positions: Vec<_> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![2, 5, 6, 7]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("\"unterminated"),
            Err(BiletoError::Query { position: 0, .. })
        ));
        assert!(matches!(
            tokenize("a status:"),
            Err(BiletoError::Query { position: 2, .. })
        ));
        assert!(tokenize("status:open,").is_err());
    }
}
