//! Expression parser - tokenizes and evaluates fully-substituted expressions
//!
//! Grammar:
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | dice | ident '(' expr (',' expr)* ')' | '(' expr ')'
//! dice    := [count] ('d' | 'D') sides
//! ```

use super::dice::{roll_dice, DiceRoller};
use super::FormulaError;

/// Upper bound on dice in a single term
const MAX_DICE_COUNT: u32 = 10_000;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Dice { count: u32, sides: u32 },
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Floor,
    Ceil,
    Round,
    Abs,
    Min,
    Max,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "floor" => Some(Function::Floor),
            "ceil" => Some(Function::Ceil),
            "round" => Some(Function::Round),
            "abs" => Some(Function::Abs),
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            _ => None,
        }
    }

    fn apply(&self, args: &[f64]) -> Result<f64, FormulaError> {
        let unary = |f: fn(f64) -> f64| match args {
            [value] => Ok(f(*value)),
            _ => Err(FormulaError::ArgumentCount {
                function: self.name().to_string(),
                expected: 1,
                found: args.len(),
            }),
        };
        match self {
            Function::Floor => unary(f64::floor),
            Function::Ceil => unary(f64::ceil),
            Function::Round => unary(f64::round),
            Function::Abs => unary(f64::abs),
            Function::Min | Function::Max => {
                if args.is_empty() {
                    return Err(FormulaError::ArgumentCount {
                        function: self.name().to_string(),
                        expected: 1,
                        found: 0,
                    });
                }
                let fold = if *self == Function::Min { f64::min } else { f64::max };
                Ok(args[1..].iter().fold(args[0], |acc, v| fold(acc, *v)))
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Round => "round",
            Function::Abs => "abs",
            Function::Min => "min",
            Function::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Dice { count: u32, sides: u32 },
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Evaluate the tree, rolling dice through `roller`
    pub fn evaluate(&self, roller: &dyn DiceRoller) -> Result<f64, FormulaError> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Dice { count, sides } => Ok(roll_dice(*count, *sides, roller) as f64),
            Expr::Negate(inner) => Ok(-inner.evaluate(roller)?),
            Expr::Binary(op, left, right) => {
                let left = left.evaluate(roller)?;
                let right = right.evaluate(roller)?;
                match op {
                    BinaryOp::Add => Ok(left + right),
                    BinaryOp::Sub => Ok(left - right),
                    BinaryOp::Mul => Ok(left * right),
                    BinaryOp::Div => {
                        if right == 0.0 {
                            Err(FormulaError::DivisionByZero)
                        } else {
                            Ok(left / right)
                        }
                    }
                }
            }
            Expr::Call(function, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(roller))
                    .collect::<Result<Vec<_>, _>>()?;
                function.apply(&values)
            }
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            ' ' | '\t' | '\n' | '\r' => pos += 1,
            '+' => {
                tokens.push(Token::Plus);
                pos += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                pos += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let literal: String = chars[start..pos].iter().collect();
                if is_dice_marker(&chars, pos) {
                    let count = parse_dice_part(&literal)?;
                    let (sides, next) = read_sides(&chars, pos + 1)?;
                    tokens.push(dice_token(count, sides)?);
                    pos = next;
                } else {
                    let value = literal.parse::<f64>().map_err(|_| FormulaError::UnexpectedToken {
                        token: literal.clone(),
                        position: start,
                    })?;
                    tokens.push(Token::Number(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                if is_dice_marker(&chars, pos) {
                    let (sides, next) = read_sides(&chars, pos + 1)?;
                    tokens.push(dice_token(1, sides)?);
                    pos = next;
                    continue;
                }
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            }
            other => {
                return Err(FormulaError::UnexpectedToken {
                    token: other.to_string(),
                    position: pos,
                })
            }
        }
    }

    Ok(tokens)
}

/// `d`/`D` immediately followed by a digit
fn is_dice_marker(chars: &[char], pos: usize) -> bool {
    matches!(chars.get(pos), Some('d') | Some('D'))
        && chars.get(pos + 1).map_or(false, |c| c.is_ascii_digit())
}

fn read_sides(chars: &[char], start: usize) -> Result<(u32, usize), FormulaError> {
    let mut pos = start;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    let literal: String = chars[start..pos].iter().collect();
    Ok((parse_dice_part(&literal)?, pos))
}

fn parse_dice_part(literal: &str) -> Result<u32, FormulaError> {
    literal
        .parse::<u32>()
        .map_err(|_| FormulaError::InvalidDice(literal.to_string()))
}

fn dice_token(count: u32, sides: u32) -> Result<Token, FormulaError> {
    if sides == 0 || count > MAX_DICE_COUNT {
        return Err(FormulaError::InvalidDice(format!("{}d{}", count, sides)));
    }
    Ok(Token::Dice { count, sides })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.next() {
            Some(ref token) if *token == expected => Ok(()),
            Some(token) => Err(self.unexpected(&token)),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn unexpected(&self, token: &Token) -> FormulaError {
        FormulaError::UnexpectedToken {
            token: format!("{:?}", token),
            position: self.pos.saturating_sub(1),
        }
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Negate(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Dice { count, sides }) => Ok(Expr::Dice { count, sides }),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let function =
                    Function::from_name(&name).ok_or(FormulaError::UnknownFunction(name))?;
                self.expect(Token::LParen)?;
                let mut args = vec![self.expr()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    args.push(self.expr()?);
                }
                self.expect(Token::RParen)?;
                Ok(Expr::Call(function, args))
            }
            Some(token) => Err(self.unexpected(&token)),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}

/// Parse a fully-substituted expression into a tree
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(FormulaError::UnexpectedEnd);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if let Some(token) = parser.next() {
        return Err(parser.unexpected(&token));
    }
    Ok(expr)
}
