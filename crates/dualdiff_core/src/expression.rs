use crate::autodiff::Dual;
use crate::babylonian::{babylonian, BabylonianSettings};
use crate::derivative::try_derivative;
use crate::error::AdError;
use crate::traits::Scalar;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unknown variable or parameter: {0}")]
    UnknownSymbol(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("parameter count mismatch: {names} names, {values} values")]
    ParameterCountMismatch { names: usize, values: usize },
    #[error("parameter '{0}' is declared more than once")]
    DuplicateParameter(String),
    #[error("parameter '{0}' has the same name as the variable")]
    ParameterShadowsVariable(String),
}

/// OpCodes for the stack machine.
/// The VM operates on a stack of `Scalar` values (f64 or Dual).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant onto the stack.
    LoadConst(f64),
    /// Pushes the independent variable.
    LoadVar,
    /// Pushes a parameter (by index).
    LoadParam(usize),
    /// Pops (b, a), pushes (a + b).
    Add,
    /// Pops (b, a), pushes (a - b).
    Sub,
    /// Pops (b, a), pushes (a * b).
    Mul,
    /// Pops (b, a), pushes (a / b).
    Div,
    /// Pops (b, a), pushes (a ^ b). Fails for non-integer powers of a dual.
    Pow,
    /// Pops a, pushes -a.
    Neg,
    /// Pops a, pushes its Babylonian square root.
    Sqrt,
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

/// Stack-based virtual machine for evaluating compiled expressions.
pub struct VM;

impl VM {
    /// Runs `bytecode` with `x` as the independent variable. `stack` is a
    /// scratch buffer reused between calls.
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        x: T,
        params: &[T],
        stack: &mut Vec<T>,
    ) -> Result<T, AdError> {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => stack.push(T::from_real(val)),
                OpCode::LoadVar => stack.push(x),
                OpCode::LoadParam(idx) => {
                    let value = params
                        .get(idx)
                        .ok_or(AdError::MalformedBytecode("parameter index out of range"))?;
                    stack.push(*value);
                }
                OpCode::Add => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a + b);
                }
                OpCode::Sub => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a - b);
                }
                OpCode::Mul => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a * b);
                }
                OpCode::Div => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a / b);
                }
                OpCode::Pow => {
                    let (a, b) = pop_pair(stack)?;
                    stack.push(a.try_powf(b)?);
                }
                OpCode::Neg => {
                    let a = pop(stack)?;
                    stack.push(-a);
                }
                OpCode::Sqrt => {
                    let a = pop(stack)?;
                    stack.push(babylonian(a, BabylonianSettings::default()));
                }
            }
        }

        let result = pop(stack)?;
        if !stack.is_empty() {
            return Err(AdError::MalformedBytecode("values left on stack"));
        }
        Ok(result)
    }
}

fn pop<T>(stack: &mut Vec<T>) -> Result<T, AdError> {
    stack
        .pop()
        .ok_or(AdError::MalformedBytecode("stack underflow"))
}

fn pop_pair<T>(stack: &mut Vec<T>) -> Result<(T, T), AdError> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    Ok((a, b))
}

// --- AST & Parser ---

/// Abstract syntax tree for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>), // char is operator +, -, *, /, ^
    Neg(Box<Expr>),
    Call(String, Box<Expr>),
}

/// Compiles an [`Expr`] into [`Bytecode`], resolving names to the
/// independent variable or a parameter slot.
pub struct Compiler {
    pub variable: String,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(variable: &str, param_names: &[String]) -> Result<Self, ExpressionError> {
        let mut param_map = HashMap::with_capacity(param_names.len());
        for (i, name) in param_names.iter().enumerate() {
            if name == variable {
                return Err(ExpressionError::ParameterShadowsVariable(name.clone()));
            }
            if param_map.insert(name.clone(), i).is_some() {
                return Err(ExpressionError::DuplicateParameter(name.clone()));
            }
        }
        Ok(Self {
            variable: variable.to_string(),
            param_map,
        })
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, ExpressionError> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<(), ExpressionError> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if *name == self.variable {
                    ops.push(OpCode::LoadVar);
                } else if let Some(&idx) = self.param_map.get(name) {
                    ops.push(OpCode::LoadParam(idx));
                } else {
                    return Err(ExpressionError::UnknownSymbol(name.clone()));
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                match op {
                    '+' => ops.push(OpCode::Add),
                    '-' => ops.push(OpCode::Sub),
                    '*' => ops.push(OpCode::Mul),
                    '/' => ops.push(OpCode::Div),
                    '^' => ops.push(OpCode::Pow),
                    other => return Err(ExpressionError::UnexpectedToken(other.to_string())),
                }
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(func, arg) => {
                self.compile_recursive(arg, ops)?;
                match func.as_str() {
                    "sqrt" => ops.push(OpCode::Sqrt),
                    _ => return Err(ExpressionError::UnknownFunction(func.clone())),
                }
            }
        }
        Ok(())
    }
}

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expression()?;
    match parser.consume() {
        None => Ok(expr),
        Some(token) => Err(ExpressionError::UnexpectedToken(format!("{token:?}"))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&(_, d)) = chars.peek() {
                let exponent_sign = (d == '+' || d == '-') && num_str.ends_with(['e', 'E']);
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = num_str
                .parse()
                .map_err(|_| ExpressionError::InvalidNumber(num_str.clone()))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => return Err(ExpressionError::UnexpectedCharacter(c, pos)),
            };
            tokens.push(token);
            chars.next();
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<(), ExpressionError> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(ExpressionError::UnexpectedToken(format!("{other:?}"))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    // expression := term (('+' | '-') term)*
    fn parse_expression(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_term()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => '+',
                Token::Minus => '-',
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // term := unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => '*',
                Token::Slash => '/',
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // unary := '-' unary | power
    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            let expr = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(expr)));
        }
        self.parse_power()
    }

    // power := primary ('^' unary)?   (right-associative, -x^2 = -(x^2))
    fn parse_power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_expression()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(name, Box::new(arg)))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(other) => Err(ExpressionError::UnexpectedToken(format!("{other:?}"))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

// --- Expression ---

/// A compiled univariate expression with bound parameter values.
///
/// Evaluation only reads the expression, so one instance can be shared
/// across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub bytecode: Bytecode,
    pub params: Vec<f64>,
}

impl Expression {
    pub fn new(bytecode: Bytecode, params: Vec<f64>) -> Self {
        Self { bytecode, params }
    }

    /// Parses and compiles `source`, treating `variable` as the input and
    /// `param_names[i]` as bound to `params[i]`.
    pub fn compile(
        source: &str,
        variable: &str,
        param_names: &[String],
        params: Vec<f64>,
    ) -> Result<Self, ExpressionError> {
        if param_names.len() != params.len() {
            return Err(ExpressionError::ParameterCountMismatch {
                names: param_names.len(),
                values: params.len(),
            });
        }
        let expr = parse(source)?;
        let bytecode = Compiler::new(variable, param_names)?.compile(&expr)?;
        Ok(Self::new(bytecode, params))
    }

    /// Evaluates on any scalar; parameters are promoted as constants.
    pub fn eval<T: Scalar>(&self, x: T) -> Result<T, AdError> {
        let params: Vec<T> = self.params.iter().map(|&p| T::from_real(p)).collect();
        let mut stack = Vec::with_capacity(16);
        VM::execute(&self.bytecode, x, &params, &mut stack)
    }

    pub fn value(&self, x: f64) -> Result<f64, AdError> {
        let mut stack = Vec::with_capacity(16);
        VM::execute(&self.bytecode, x, &self.params, &mut stack)
    }

    pub fn eval_dual(&self, x: Dual) -> Result<Dual, AdError> {
        self.eval(x)
    }

    pub fn derivative(&self, x: f64) -> Result<f64, AdError> {
        try_derivative(|seed| self.eval_dual(seed), x)
    }

    pub fn value_and_derivative(&self, x: f64) -> Result<(f64, f64), AdError> {
        let result = self.eval_dual(Dual::variable(x))?;
        Ok((result.value(), result.epsilon()))
    }
}
