use crate::TemplateError;
use std::{
    fmt,
    iter::Peekable,
    str::CharIndices,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Question,
    QuestionQuestion,
    Colon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Ident(name) => write!(f, "`{name}`"),
            other => {
                let symbol = match other {
                    Token::LParen => "(",
                    Token::RParen => ")",
                    Token::Comma => ",",
                    Token::Dot => ".",
                    Token::Plus => "+",
                    Token::Minus => "-",
                    Token::Star => "*",
                    Token::Slash => "/",
                    Token::Percent => "%",
                    Token::Bang => "!",
                    Token::Lt => "<",
                    Token::Le => "<=",
                    Token::Gt => ">",
                    Token::Ge => ">=",
                    Token::EqEq => "==",
                    Token::NotEq => "!=",
                    Token::AndAnd => "&&",
                    Token::OrOr => "||",
                    Token::Question => "?",
                    Token::QuestionQuestion => "??",
                    Token::Colon => ":",
                    Token::Number(_) | Token::Str(_) | Token::Ident(_) => "",
                };
                write!(f, "`{symbol}`")
            }
        }
    }
}

/// Split the inside of a `${...}` segment into tokens.
///
/// `===` and `!==` are accepted as spellings of `==` and `!=`.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '0'..='9' => lex_number(source, &mut chars)?,
            '\'' | '"' => lex_string(&mut chars, offset)?,
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = offset;
                let mut end = offset;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '$' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(source[start..end].to_string())
            }
            _ => {
                chars.next();
                match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    '.' => Token::Dot,
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    ':' => Token::Colon,
                    '<' if next_is(&mut chars, '=') => Token::Le,
                    '<' => Token::Lt,
                    '>' if next_is(&mut chars, '=') => Token::Ge,
                    '>' => Token::Gt,
                    '=' if next_is(&mut chars, '=') => {
                        next_is(&mut chars, '=');
                        Token::EqEq
                    }
                    '!' if next_is(&mut chars, '=') => {
                        next_is(&mut chars, '=');
                        Token::NotEq
                    }
                    '!' => Token::Bang,
                    '&' if next_is(&mut chars, '&') => Token::AndAnd,
                    '|' if next_is(&mut chars, '|') => Token::OrOr,
                    '?' if next_is(&mut chars, '?') => Token::QuestionQuestion,
                    '?' => Token::Question,
                    other => return Err(TemplateError::UnexpectedChar(other, offset)),
                }
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn next_is(chars: &mut Peekable<CharIndices<'_>>, expected: char) -> bool {
    chars.next_if(|&(_, c)| c == expected).is_some()
}

fn lex_number(source: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<Token, TemplateError> {
    let Some(&(start, _)) = chars.peek() else {
        return Err(TemplateError::InvalidNumber(String::new()));
    };
    let mut end = start;
    let mut seen_dot = false;
    while let Some(&(i, c)) = chars.peek() {
        let is_fraction_dot = c == '.'
            && !seen_dot
            && source[i + 1..].chars().next().is_some_and(|next| next.is_ascii_digit());
        if c.is_ascii_digit() || c == '_' || is_fraction_dot {
            seen_dot |= c == '.';
            end = i + 1;
            chars.next();
        } else {
            break;
        }
    }
    let literal = source[start..end].replace('_', "");
    literal
        .parse()
        .map(Token::Number)
        .map_err(|_| TemplateError::InvalidNumber(source[start..end].to_string()))
}

fn lex_string(chars: &mut Peekable<CharIndices<'_>>, offset: usize) -> Result<Token, TemplateError> {
    let Some((_, quote)) = chars.next() else {
        return Err(TemplateError::UnterminatedString(offset));
    };
    let mut value = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            c if c == quote => return Ok(Token::Str(value)),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            c => value.push(c),
        }
    }
    Err(TemplateError::UnterminatedString(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_paths_and_operators() {
        assert_eq!(
            tokenize("position.lat * 0.3048").unwrap(),
            vec![
                Token::Ident("position".into()),
                Token::Dot,
                Token::Ident("lat".into()),
                Token::Star,
                Token::Number(0.3048),
            ]
        );
    }

    #[test]
    fn multi_character_operators() {
        assert_eq!(
            tokenize("a <= b === c ?? d !== e || !f").unwrap(),
            vec![
                Token::Ident("a".into()),
                Token::Le,
                Token::Ident("b".into()),
                Token::EqEq,
                Token::Ident("c".into()),
                Token::QuestionQuestion,
                Token::Ident("d".into()),
                Token::NotEq,
                Token::Ident("e".into()),
                Token::OrOr,
                Token::Bang,
                Token::Ident("f".into()),
            ]
        );
    }

    #[test]
    fn strings_with_escapes() {
        assert_eq!(
            tokenize(r#"'it\'s' "}""#).unwrap(),
            vec![Token::Str("it's".into()), Token::Str("}".into())]
        );
        assert_eq!(tokenize("'open"), Err(TemplateError::UnterminatedString(0)));
    }

    #[test]
    fn numbers() {
        assert_eq!(tokenize("1609.34").unwrap(), vec![Token::Number(1609.34)]);
        assert_eq!(tokenize("1_000").unwrap(), vec![Token::Number(1000.0)]);
        assert_eq!(
            tokenize("10.").unwrap(),
            vec![Token::Number(10.0), Token::Dot],
            "a trailing dot is not part of the number"
        );
    }

    #[test]
    fn rejects_unknown_characters() {
        assert_eq!(tokenize("a # b"), Err(TemplateError::UnexpectedChar('#', 2)));
        assert_eq!(tokenize("a = b"), Err(TemplateError::UnexpectedChar('=', 2)));
        assert_eq!(tokenize("a & b"), Err(TemplateError::UnexpectedChar('&', 2)));
    }
}
