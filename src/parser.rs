//! 过滤表达式的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse_filter_expression()
//!   ├─ Lexer 按 " and " / " or " / "(" / ")" 切分
//!   └─ Parser::parse()
//!        └─ parse_sequence()
//!             ├─ parse_operand()
//!             │    ├─ "(" → parse_sequence() (递归), 期望 ")"
//!             │    └─ 条件文本 → condition::parse_condition()
//!             │
//!             └─ 遇到 and/or 时，解析右侧 operand，与已累积的左侧合并
//! ```
//!
//! ## 语法规则
//!
//! - 连接词之间**没有优先级**，严格从左到右结合：
//!   `a=1 or b=2 and c=3` 等价于 `(a=1 or b=2) and c=3`
//! - 括号分组整体作为一个操作数，可以任意嵌套
//! - 同一逻辑节点下的两个同字段条件会折叠为一条链，见 [`FilterNode::combine`]
//!
//! ## 解析示例
//!
//! ```text
//! age >= 18                      -> {"age": ["egt", "18"]}
//! a=1 and (b>2 or c like x)      -> {"_logic": "and", "0": {...}, "1": {"_logic": "or", ...}}
//! dept_id = 4 or dept_id > 20    -> {"dept_id": [["gt", "20"], ["eq", "4"], "or"]}
//! ```

use crate::ast::{Connective, FilterNode};
use crate::condition::parse_condition;
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&'a Token<'a>> {
        let tokens = self.tokens;
        tokens.get(self.position)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    /// 解析全部 token；没有任何 token 时返回 `None`
    pub fn parse(&mut self) -> Result<Option<FilterNode>, ParseError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let node = self.parse_sequence()?;

        // parse_sequence 只会停在非连接词的 token 上
        if let Some(token) = self.peek() {
            return Err(match token.kind {
                TokenKind::RParen => ParseError::UnbalancedParenthesis {
                    position: token.span.start,
                },
                _ => ParseError::unexpected_token(describe(token), token.span.start),
            });
        }

        Ok(Some(node))
    }

    /// 解析 `operand (connective operand)*`，从左到右累积
    fn parse_sequence(&mut self) -> Result<FilterNode, ParseError> {
        let mut left = self.parse_operand()?;

        while let Some(token) = self.peek() {
            let operator = match token.kind {
                TokenKind::And => Connective::And,
                TokenKind::Or => Connective::Or,
                _ => break,
            };
            self.advance(); // 消费连接词
            let right = self.parse_operand()?;
            left = FilterNode::combine(operator, left, right);
        }

        Ok(left)
    }

    /// 解析单个操作数：括号分组或条件文本
    fn parse_operand(&mut self) -> Result<FilterNode, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::UnexpectedEnd);
        };

        match token.kind {
            TokenKind::Condition(text) => Ok(FilterNode::Leaf(parse_condition(text)?)),
            TokenKind::LParen => {
                let open = token.span.start;
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
                    return Err(ParseError::EmptyCondition);
                }

                // 分组内提前结束说明右括号缺失
                let inner = self.parse_sequence().map_err(|err| match err {
                    ParseError::UnexpectedEnd => ParseError::UnbalancedParenthesis { position: open },
                    other => other,
                })?;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(ParseError::unexpected_token(
                        describe(other),
                        other.span.start,
                    )),
                    None => Err(ParseError::UnbalancedParenthesis { position: open }),
                }
            }
            TokenKind::RParen => Err(ParseError::UnbalancedParenthesis {
                position: token.span.start,
            }),
            TokenKind::And | TokenKind::Or => {
                Err(ParseError::unexpected_token(describe(token), token.span.start))
            }
        }
    }
}

fn describe(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::And => "and".to_string(),
        TokenKind::Or => "or".to_string(),
        TokenKind::LParen => "(".to_string(),
        TokenKind::RParen => ")".to_string(),
        TokenKind::Condition(text) => text.trim().to_string(),
    }
}

/// 将完整的过滤表达式解析为条件树
///
/// 空表达式返回 `Ok(None)`，下游不会生成任何过滤条件。
pub fn parse_filter_expression(input: &str) -> Result<Option<FilterNode>, ParseError> {
    let tokens: Vec<_> = Lexer::new(input).collect();
    tracing::trace!(expression = input, tokens = tokens.len(), "Tokenized filter");

    let tree = Parser::new(&tokens).parse()?;
    tracing::debug!(expression = input, empty = tree.is_none(), "Built filter tree");
    Ok(tree)
}
