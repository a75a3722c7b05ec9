use thiserror::Error;

use crate::budget::BudgetItem;

/// Nesting limit for parentheses and unary operators.
const MAX_DEPTH: usize = 64;

/// Token limit per formula. Operator chains nest the AST once per operator,
/// so this also bounds evaluation depth.
const MAX_TOKENS: usize = 512;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("malformed placeholder at offset {0}")]
    BadPlaceholder(usize),
    #[error("unexpected token at offset {0}")]
    UnexpectedToken(usize),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("formula nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("formula has more than {0} tokens")]
    TooLong(usize),
}

/// Line item field a placeholder refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    /// `P`: unit price.
    Price,
    /// `Q`: quantity.
    Quantity,
    /// `T`: price times quantity.
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Arithmetic AST for budget formulas such as `{1P}*{1Q}+{2T}`.
///
/// Only numbers, item placeholders and `+ - * /` with parentheses exist;
/// there is no way to name a function or variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    Number {
        value: f64,
    },
    /// `{NP}`, `{NQ}` or `{NT}` with a 1-based item index.
    Field {
        item: usize,
        field: ItemField,
    },
    Neg {
        operand: Box<Formula>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Formula>,
        right: Box<Formula>,
    },
}

impl Formula {
    pub fn parse(source: &str) -> Result<Formula, FormulaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            source_len: source.len(),
        };
        let formula = parser.expression()?;
        match parser.peek() {
            None => Ok(formula),
            Some(spanned) => Err(FormulaError::UnexpectedToken(spanned.offset)),
        }
    }

    /// Evaluates against the budget's line items with IEEE float semantics.
    pub fn evaluate(&self, items: &[BudgetItem]) -> f64 {
        match self {
            Formula::Number { value } => *value,
            Formula::Field { item, field } => {
                let Some(item) = item.checked_sub(1).and_then(|index| items.get(index)) else {
                    return 0.0;
                };
                match field {
                    ItemField::Price => item.price(),
                    ItemField::Quantity => item.quantity(),
                    ItemField::Total => item.price() * item.quantity(),
                }
            }
            Formula::Neg { operand } => -operand.evaluate(items),
            Formula::Binary { op, left, right } => {
                let left = left.evaluate(items);
                let right = right.evaluate(items);
                match op {
                    BinaryOp::Add => left + right,
                    BinaryOp::Sub => left - right,
                    BinaryOp::Mul => left * right,
                    BinaryOp::Div => left / right,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Field(usize, ItemField),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(&(_, e)) = chars.peek()
                    && (e == 'e' || e == 'E')
                {
                    literal.push(e);
                    chars.next();
                    if let Some(&(_, sign)) = chars.peek()
                        && (sign == '+' || sign == '-')
                    {
                        literal.push(sign);
                        chars.next();
                    }
                    while let Some(&(_, c)) = chars.peek() {
                        if !c.is_ascii_digit() {
                            break;
                        }
                        literal.push(c);
                        chars.next();
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber(literal.clone()))?;
                Token::Number(value)
            }
            '{' => {
                chars.next();
                let mut digits = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    digits.push(c);
                    chars.next();
                }
                let field = match chars.next() {
                    Some((_, 'P')) => ItemField::Price,
                    Some((_, 'Q')) => ItemField::Quantity,
                    Some((_, 'T')) => ItemField::Total,
                    _ => return Err(FormulaError::BadPlaceholder(offset)),
                };
                if digits.is_empty() || !matches!(chars.next(), Some((_, '}'))) {
                    return Err(FormulaError::BadPlaceholder(offset));
                }
                // An index too large to address any item reads as zero.
                let item = digits.parse::<usize>().unwrap_or(usize::MAX);
                if tokens.len() >= MAX_TOKENS {
                    return Err(FormulaError::TooLong(MAX_TOKENS));
                }
                tokens.push(Spanned {
                    token: Token::Field(item, field),
                    offset,
                });
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::Open,
            ')' => Token::Close,
            found => return Err(FormulaError::UnexpectedChar { found, offset }),
        };
        if tokens.len() >= MAX_TOKENS {
            return Err(FormulaError::TooLong(MAX_TOKENS));
        }
        if !matches!(token, Token::Number(_)) {
            chars.next();
        }
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    source_len: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).copied();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn descend(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(FormulaError::TooDeep(MAX_DEPTH))
        } else {
            Ok(())
        }
    }

    fn expression(&mut self) -> Result<Formula, FormulaError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek().map(|spanned| &spanned.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Formula::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn term(&mut self) -> Result<Formula, FormulaError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().map(|spanned| &spanned.token) {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Formula::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Formula, FormulaError> {
        match self.peek().map(|spanned| &spanned.token) {
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let operand = self.unary()?;
                self.depth -= 1;
                Ok(Formula::Neg {
                    operand: Box::new(operand),
                })
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let operand = self.unary()?;
                self.depth -= 1;
                Ok(operand)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Formula, FormulaError> {
        let end = self.source_len;
        let Some(spanned) = self.next() else {
            return Err(FormulaError::UnexpectedEnd);
        };
        let offset = spanned.offset;
        match spanned.token {
            Token::Number(value) => Ok(Formula::Number { value }),
            Token::Field(item, field) => Ok(Formula::Field { item, field }),
            Token::Open => {
                self.descend()?;
                let inner = self.expression()?;
                self.depth -= 1;
                match self.next() {
                    Some(Spanned {
                        token: Token::Close,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(FormulaError::UnexpectedToken(other.offset)),
                    None => Err(FormulaError::UnexpectedToken(end)),
                }
            }
            _ => Err(FormulaError::UnexpectedToken(offset)),
        }
    }
}
