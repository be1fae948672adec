use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Backtick-quoted variable name
    Var(String),
    /// Bare word: keyword, number or operator symbol -- distinguished in the parser
    Word(String),
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    /// Character offset of the token start
    pub offset: usize,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '"' | '`')
}

pub fn lex(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;

        let punct = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = punct {
            tokens.push(Spanned {
                token,
                offset: start,
            });
            pos += 1;
            continue;
        }

        // String literal
        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(ExprError::parse(format!(
                        "unterminated string literal at offset {}",
                        start
                    )));
                }
                let sc = chars[pos];
                if sc == '"' {
                    pos += 1;
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    if pos >= chars.len() {
                        return Err(ExprError::parse(format!(
                            "unterminated escape in string at offset {}",
                            start
                        )));
                    }
                    match chars[pos] {
                        '"' => s.push('"'),
                        '\'' => s.push('\''),
                        '\\' => s.push('\\'),
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        other => {
                            return Err(ExprError::parse(format!(
                                "invalid escape '\\{}' in string at offset {}",
                                other, start
                            )));
                        }
                    }
                    pos += 1;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                offset: start,
            });
            continue;
        }

        // Variable reference
        if c == '`' {
            pos += 1;
            let name_start = pos;
            while pos < chars.len() && chars[pos] != '`' {
                pos += 1;
            }
            if pos >= chars.len() {
                return Err(ExprError::parse(format!(
                    "unterminated variable name at offset {}",
                    start
                )));
            }
            let name: String = chars[name_start..pos].iter().collect();
            pos += 1; // closing backtick
            if name.trim().is_empty() {
                return Err(ExprError::parse(format!(
                    "empty variable name at offset {}",
                    start
                )));
            }
            tokens.push(Spanned {
                token: Token::Var(name),
                offset: start,
            });
            continue;
        }

        // Bare word
        while pos < chars.len() && !is_delimiter(chars[pos]) {
            pos += 1;
        }
        let word: String = chars[start..pos].iter().collect();
        tokens.push(Spanned {
            token: Token::Word(word),
            offset: start,
        });
    }

    Ok(tokens)
}
