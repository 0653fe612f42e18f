//! 过滤表达式的 token 定义

/// token 是表达式中的最小单元，包含类型和位置
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// token 类型
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // 连接词
    And, // " and "
    Or,  // " or "

    // 分组括号
    LParen, // (
    RParen, // )

    /// 单个条件的原始文本，未去除空白
    Condition(&'a str),
}

impl TokenKind<'_> {
    pub fn is_connective(&self) -> bool {
        matches!(self, TokenKind::And | TokenKind::Or)
    }
}

/// 源文本中的区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// 起始字节偏移
    pub start: usize,
    /// 结束字节偏移
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
