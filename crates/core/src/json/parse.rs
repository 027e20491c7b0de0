//! Best-effort JSON text reader
//!
//! Structural problems are collected as [`ParseIssue`]s and the reader
//! keeps going; the result is whatever could be recovered.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::{JsonMap, JsonVec};
use crate::object::SharedObject;

/// A problem found while reading JSON text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Symbol(char),
    Str(String),
    Word(String),
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Symbol(c) => write!(f, "'{c}'"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::Word(w) => f.write_str(w),
            Token::End => f.write_str("end of input"),
        }
    }
}

fn is_structural(c: char) -> bool {
    matches!(c, '{' | '}' | '[' | ']' | ':' | ',' | '"')
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Next token and the position it starts at
    fn next_token(&mut self, issues: &mut Vec<ParseIssue>) -> (Token, usize, usize) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
        let (line, column) = (self.line, self.column);
        let Some(&c) = self.chars.peek() else {
            return (Token::End, line, column);
        };
        let token = match c {
            '"' => {
                self.bump();
                Token::Str(self.string(issues, line, column))
            }
            c if is_structural(c) => {
                self.bump();
                Token::Symbol(c)
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || is_structural(c) {
                        break;
                    }
                    word.push(c);
                    self.bump();
                }
                Token::Word(word)
            }
        };
        (token, line, column)
    }

    fn string(&mut self, issues: &mut Vec<ParseIssue>, line: usize, column: usize) -> String {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return out,
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        issues.push(ParseIssue {
            line,
            column,
            message: "unterminated string".to_string(),
        });
        out
    }
}

/// Scalar value of a bareword
///
/// Words with letters (other than an exponent) stay strings; the rest
/// read as integers when they can and as floats otherwise.
fn classify_word(word: &str) -> SharedObject {
    match word {
        "true" => return SharedObject::new(true),
        "false" => return SharedObject::new(false),
        "null" => return SharedObject::null(),
        _ => {}
    }
    let lettered = word
        .chars()
        .any(|c| c.is_alphabetic() && c != 'e' && c != 'E');
    if !lettered {
        if let Ok(int) = word.parse::<i64>() {
            return SharedObject::new(int);
        }
        if let Ok(float) = word.parse::<f64>() {
            return SharedObject::new(float);
        }
    }
    SharedObject::new(word.to_string())
}

pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<(Token, usize, usize)>,
    issues: Vec<ParseIssue>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lexer: Lexer::new(text),
            peeked: None,
            issues: Vec::new(),
        }
    }

    fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token(&mut self.issues));
        }
        match &self.peeked {
            Some((token, _, _)) => token,
            None => &Token::End,
        }
    }

    fn next(&mut self) -> (Token, usize, usize) {
        match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token(&mut self.issues),
        }
    }

    fn issue(&mut self, line: usize, column: usize, message: String) {
        self.issues.push(ParseIssue {
            line,
            column,
            message,
        });
    }

    /// Consume `symbol`, or record what was found instead and leave it
    fn expect(&mut self, symbol: char) -> bool {
        if *self.peek() == Token::Symbol(symbol) {
            self.next();
            return true;
        }
        let (found, line, column) = match &self.peeked {
            Some((token, line, column)) => (token.to_string(), *line, *column),
            None => (Token::End.to_string(), self.lexer.line, self.lexer.column),
        };
        self.issue(line, column, format!("expecting '{symbol}', but {found} found"));
        false
    }

    /// Token after a member or element; false once the container is closed
    ///
    /// Anything other than a separator is reported and left in place to
    /// be read as the next member.
    fn separator(&mut self, close: char, container: &str) -> bool {
        let (token, line, column) = self.next();
        match token {
            Token::Symbol(',') => true,
            Token::Symbol(c) if c == close => false,
            Token::End => {
                self.issue(line, column, format!("unterminated {container}"));
                false
            }
            other => {
                self.issue(line, column, format!("expecting ',' or '{close}', but {other} found"));
                self.peeked = Some((other, line, column));
                true
            }
        }
    }

    /// Parse one document and report anything left over
    pub(crate) fn parse_document(mut self) -> (SharedObject, Vec<ParseIssue>) {
        let value = self.value();
        let (trailing, line, column) = self.next();
        if trailing != Token::End {
            self.issue(line, column, format!("unexpected {trailing} after document"));
        }
        (value, self.issues)
    }

    fn value(&mut self) -> SharedObject {
        let (token, line, column) = self.next();
        match token {
            Token::Symbol('{') => self.map(),
            Token::Symbol('[') => self.vec(),
            Token::Str(s) => SharedObject::new(s),
            Token::Word(w) => classify_word(&w),
            Token::End => {
                self.issue(line, column, "unexpected end of input".to_string());
                SharedObject::null()
            }
            Token::Symbol(c) => {
                self.issue(line, column, format!("unexpected '{c}'"));
                SharedObject::null()
            }
        }
    }

    fn map(&mut self) -> SharedObject {
        let mut entries = JsonMap::new();
        if *self.peek() == Token::Symbol('}') {
            self.next();
            return SharedObject::new(entries);
        }
        loop {
            let (token, line, column) = self.next();
            let key = match token {
                Token::Str(key) | Token::Word(key) => key,
                Token::End => {
                    self.issue(line, column, "unterminated object".to_string());
                    break;
                }
                other => {
                    self.issue(line, column, format!("expecting a key, but {other} found"));
                    if other == Token::Symbol('}') {
                        break;
                    }
                    continue;
                }
            };
            self.expect(':');
            let value = self.value();
            entries.insert(key, value);

            if !self.separator('}', "object") {
                break;
            }
        }
        SharedObject::new(entries)
    }

    fn vec(&mut self) -> SharedObject {
        let mut items = JsonVec::new();
        if *self.peek() == Token::Symbol(']') {
            self.next();
            return SharedObject::new(items);
        }
        loop {
            if *self.peek() == Token::End {
                let (_, line, column) = self.next();
                self.issue(line, column, "unterminated array".to_string());
                break;
            }
            items.push(self.value());
            if !self.separator(']', "array") {
                break;
            }
        }
        SharedObject::new(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (SharedObject, Vec<ParseIssue>) {
        Parser::new(text).parse_document()
    }

    #[test]
    fn test_word_classes() {
        assert_eq!(classify_word("42").get::<i64>().unwrap(), 42);
        assert_eq!(classify_word("-7").get::<i64>().unwrap(), -7);
        assert_eq!(classify_word("2.5").get::<f64>().unwrap(), 2.5);
        assert_eq!(classify_word("1e3").get::<f64>().unwrap(), 1000.0);
        assert_eq!(classify_word("1.2.3").get::<String>().unwrap(), "1.2.3");
        assert_eq!(classify_word("hello").get::<String>().unwrap(), "hello");
        assert_eq!(classify_word("nan").get::<String>().unwrap(), "nan");
        assert!(classify_word("true").get::<bool>().unwrap());
        assert!(classify_word("null").is_null());
    }

    #[test]
    fn test_nested_document() {
        let (doc, issues) = parse(r#"{"a": {"arr": [1, 2, "hello"]}, "b": 1.5}"#);
        assert!(issues.is_empty());
        let map = doc.get::<JsonMap>().unwrap();
        assert_eq!(map["b"].get::<f64>().unwrap(), 1.5);
        let inner = map["a"].get::<JsonMap>().unwrap();
        let arr = inner["arr"].get::<JsonVec>().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[2].get::<String>().unwrap(), "hello");
    }

    #[test]
    fn test_escapes() {
        let (doc, _) = parse(r#""a\nb\t\"c\"""#);
        assert_eq!(doc.get::<String>().unwrap(), "a\nb\t\"c\"");
    }

    #[test]
    fn test_recovers_from_missing_colon() {
        let (doc, issues) = parse("{\"a\" 1, \"b\": 2}");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 1);
        assert_eq!(issues[0].column, 6);
        assert!(issues[0].message.contains("expecting ':'"));
        let map = doc.get::<JsonMap>().unwrap();
        assert_eq!(map["a"].get::<i64>().unwrap(), 1);
        assert_eq!(map["b"].get::<i64>().unwrap(), 2);
    }

    #[test]
    fn test_unterminated_input() {
        let (doc, issues) = parse("[1, 2");
        assert_eq!(doc.get::<JsonVec>().unwrap().len(), 2);
        assert!(issues.iter().any(|i| i.message.contains("unterminated array")));

        let (doc, issues) = parse("[1 2]");
        assert_eq!(doc.get::<JsonVec>().unwrap().len(), 2);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("expecting ',' or ']', but 2 found"));

        let (_, issues) = parse("{\"a\": 1}\n]");
        assert_eq!(issues.len(), 1);
        assert_eq!((issues[0].line, issues[0].column), (2, 1));
    }
}
