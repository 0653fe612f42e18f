//! 过滤表达式的分词器
//!
//! 只识别逻辑连接词 ` and ` / ` or ` 以及分组括号，其余文本原样作为条件 token 交给条件解析器。

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 检查给定位置是否以分隔符开头，返回分隔符类型和字节长度
    fn delimiter_at(&self, position: usize) -> Option<(TokenKind<'a>, usize)> {
        let rest = &self.input.as_bytes()[position..];
        match rest.first()? {
            b'(' => Some((TokenKind::LParen, 1)),
            b')' => Some((TokenKind::RParen, 1)),
            b' ' => {
                if starts_with_ignore_case(rest, b" and ") {
                    Some((TokenKind::And, 5))
                } else if starts_with_ignore_case(rest, b" or ") {
                    Some((TokenKind::Or, 4))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// 读取条件文本，直到遇到下一个分隔符或输入结束
    fn read_condition(&mut self) -> &'a str {
        let start = self.position;
        while self.position < self.input.len() && self.delimiter_at(self.position).is_none() {
            self.position += 1;
        }
        // 分隔符都是 ASCII，所以停下的位置一定落在字符边界上
        &self.input[start..self.position]
    }
}

fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.position >= self.input.len() {
                return None; // 到达输入末尾
            }
            let start = self.position;

            if let Some((kind, len)) = self.delimiter_at(start) {
                self.position += len;
                return Some(Token {
                    kind,
                    span: Span::new(start, self.position),
                });
            }

            let text = self.read_condition();
            // 丢弃纯空白的片段
            if text.trim().is_empty() {
                continue;
            }
            return Some(Token {
                kind: TokenKind::Condition(text),
                span: Span::new(start, self.position),
            });
        }
    }
}
