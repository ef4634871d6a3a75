// Restricted analysis language
//
// Model-generated snippets are never evaluated as host code. They are parsed
// and interpreted here, against a read-only view of the dataset: assignments,
// arithmetic, and a fixed set of aggregate methods on table views. There are
// no loops, no I/O primitives, and no bindings beyond the dataset handle, so
// the untrusted snippet cannot reach the process environment or mutate the
// shared dataset.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use thiserror::Error;

use crate::dataset::Dataset;

/// Fixed binding name through which snippets reference the dataset.
pub const DATASET_BINDING: &str = "records";

/// Binding the snippet must assign its final answer to.
pub const RESULT_BINDING: &str = "result";

/// Upper bound on statements per snippet.
pub const MAX_STATEMENTS: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum LangError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("snippet exceeds {MAX_STATEMENTS} statements")]
    TooManyStatements,
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("method '{0}' expects {1} argument(s)")]
    BadArity(&'static str, usize),
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("column '{0}' is not numeric")]
    NotNumericColumn(String),
    #[error("column '{0}' is not textual")]
    NotTextColumn(String),
    #[error("aggregate over an empty table")]
    EmptyAggregate,
    #[error("type error: {0}")]
    Type(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Result value of a snippet: a scalar, a sequence, or a filtered table view.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    List(Vec<Value>),
    Table(TableView),
}

/// Read-only subset of dataset rows, by index.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    rows: Vec<usize>,
}

impl TableView {
    fn full(dataset: &Dataset) -> Self {
        Self {
            rows: (0..dataset.row_count()).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Value {
    /// Stringify for the result-explanation prompt. Whole numbers render as
    /// integers; fractional numbers with two decimal places.
    #[inline]
    pub fn render(&self) -> String {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            Value::Number(n) => format!("{:.2}", n),
            Value::Text(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::render)
                .collect::<Vec<_>>()
                .join(", "),
            Value::Table(view) => format!("{} matching records", view.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Dot,
    LParen,
    RParen,
    Comma,
    Newline,
}

fn lex(source: &str) -> Result<Vec<Token>, LangError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '\n' => {
                chars.next();
                tokens.push(Token::Newline);
            }
            '#' => {
                // comment to end of line
                for next in chars.by_ref() {
                    if next == '\n' {
                        tokens.push(Token::Newline);
                        break;
                    }
                }
            }
            '=' => {
                chars.next();
                tokens.push(Token::Assign);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == quote {
                        closed = true;
                        break;
                    }
                    literal.push(next);
                }
                if !closed {
                    return Err(LangError::UnterminatedString);
                }
                tokens.push(Token::Str(literal));
            }
            c if c.is_ascii_digit() => {
                let mut literal = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        literal.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| LangError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(LangError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone)]
enum Expr {
    Number(f64),
    Str(String),
    Var(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
struct Stmt {
    name: String,
    expr: Expr,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), LangError> {
        match self.advance() {
            Some(token) if token == *expected => Ok(()),
            Some(token) => Err(LangError::UnexpectedToken(format!("{:?}", token))),
            None => Err(LangError::UnexpectedEnd),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Some(Token::Newline)) {
            self.pos += 1;
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, LangError> {
        let mut stmts = Vec::new();

        loop {
            self.skip_newlines();
            if self.peek().is_none() {
                break;
            }

            stmts.push(self.parse_stmt()?);
            if stmts.len() > MAX_STATEMENTS {
                return Err(LangError::TooManyStatements);
            }

            match self.peek() {
                None => break,
                Some(Token::Newline) => {}
                Some(token) => {
                    return Err(LangError::UnexpectedToken(format!("{:?}", token)));
                }
            }
        }

        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, LangError> {
        let name = match self.advance() {
            Some(Token::Ident(name)) => name,
            Some(token) => return Err(LangError::UnexpectedToken(format!("{:?}", token))),
            None => return Err(LangError::UnexpectedEnd),
        };
        self.expect(&Token::Assign)?;
        let expr = self.parse_expr()?;
        Ok(Stmt { name, expr })
    }

    fn parse_expr(&mut self) -> Result<Expr, LangError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, LangError> {
        let mut lhs = self.parse_postfix()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_postfix()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Expr, LangError> {
        let mut expr = self.parse_primary()?;

        while matches!(self.peek(), Some(Token::Dot)) {
            self.pos += 1;
            let method = match self.advance() {
                Some(Token::Ident(name)) => name,
                Some(token) => return Err(LangError::UnexpectedToken(format!("{:?}", token))),
                None => return Err(LangError::UnexpectedEnd),
            };
            self.expect(&Token::LParen)?;

            let mut args = Vec::new();
            if !matches!(self.peek(), Some(Token::RParen)) {
                loop {
                    args.push(self.parse_expr()?);
                    match self.peek() {
                        Some(Token::Comma) => {
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
            }
            self.expect(&Token::RParen)?;

            expr = Expr::MethodCall {
                receiver: Box::new(expr),
                method,
                args,
            };
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, LangError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::Minus) => Ok(Expr::Neg(Box::new(self.parse_primary()?))),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(token) => Err(LangError::UnexpectedToken(format!("{:?}", token))),
            None => Err(LangError::UnexpectedEnd),
        }
    }
}

/// Interprets a snippet against a borrowed, immutable dataset.
pub struct Interpreter<'a> {
    dataset: &'a Dataset,
}

impl<'a> Interpreter<'a> {
    #[inline]
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    /// Run a snippet and return the value bound to [`RESULT_BINDING`], if the
    /// snippet bound one.
    #[inline]
    pub fn run(&self, source: &str) -> Result<Option<Value>, LangError> {
        let tokens = lex(source)?;
        let stmts = Parser::new(tokens).parse_program()?;

        let mut env: HashMap<String, Value> = HashMap::new();
        env.insert(
            DATASET_BINDING.to_string(),
            Value::Table(TableView::full(self.dataset)),
        );

        for stmt in stmts {
            let value = self.eval(&stmt.expr, &env)?;
            env.insert(stmt.name, value);
        }

        Ok(env.remove(RESULT_BINDING))
    }

    fn eval(&self, expr: &Expr, env: &HashMap<String, Value>) -> Result<Value, LangError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Text(s.clone())),
            Expr::Var(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| LangError::UnknownVariable(name.clone())),
            Expr::Neg(inner) => match self.eval(inner, env)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(LangError::Type(format!(
                    "cannot negate {}",
                    type_name(&other)
                ))),
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, env)?;
                let rhs = self.eval(rhs, env)?;
                let (Value::Number(a), Value::Number(b)) = (&lhs, &rhs) else {
                    return Err(LangError::Type(format!(
                        "arithmetic requires numbers, got {} and {}",
                        type_name(&lhs),
                        type_name(&rhs)
                    )));
                };
                let result = match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if *b == 0.0 {
                            return Err(LangError::DivisionByZero);
                        }
                        a / b
                    }
                };
                Ok(Value::Number(result))
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(receiver, env)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_method(receiver, method, args)
            }
        }
    }

    fn call_method(
        &self,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, LangError> {
        match receiver {
            Value::Table(view) => self.call_table_method(&view, method, args),
            Value::List(items) => match method {
                "count" => {
                    expect_arity("count", &args, 0)?;
                    Ok(Value::Number(items.len() as f64))
                }
                other => Err(LangError::UnknownMethod(other.to_string())),
            },
            _ => Err(LangError::UnknownMethod(method.to_string())),
        }
    }

    fn call_table_method(
        &self,
        view: &TableView,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, LangError> {
        match method {
            "count" => {
                expect_arity("count", &args, 0)?;
                Ok(Value::Number(view.len() as f64))
            }
            "sum" | "mean" | "median" | "min" | "max" => {
                let column = single_column_arg(method_name(method), &args)?;
                let values = self.numeric_values(view, &column)?;
                self.numeric_aggregate(method, &values)
            }
            "most_common" => {
                let column = single_column_arg("most_common", &args)?;
                let values = self.text_values(view, &column)?;
                most_common(&values).ok_or(LangError::EmptyAggregate)
            }
            "count_distinct" => {
                let column = single_column_arg("count_distinct", &args)?;
                let mut unique = self.text_values(view, &column)?;
                unique.sort_unstable();
                unique.dedup();
                Ok(Value::Number(unique.len() as f64))
            }
            "distinct" => {
                let column = single_column_arg("distinct", &args)?;
                let mut unique = self.text_values(view, &column)?;
                unique.sort_unstable();
                unique.dedup();
                Ok(Value::List(
                    unique
                        .into_iter()
                        .map(|v| Value::Text(v.to_string()))
                        .collect(),
                ))
            }
            "filter" => {
                expect_arity("filter", &args, 2)?;
                let column = column_name(&args[0])?;
                self.filter_eq(view, &column, &args[1])
            }
            "filter_gt" | "filter_lt" => {
                expect_arity(method_name(method), &args, 2)?;
                let column = column_name(&args[0])?;
                let Value::Number(threshold) = args[1] else {
                    return Err(LangError::Type(format!(
                        "{} threshold must be a number",
                        method
                    )));
                };
                self.filter_cmp(view, &column, threshold, method == "filter_gt")
            }
            other => Err(LangError::UnknownMethod(other.to_string())),
        }
    }

    fn numeric_aggregate(&self, method: &str, values: &[f64]) -> Result<Value, LangError> {
        if values.is_empty() {
            return Err(LangError::EmptyAggregate);
        }
        let result = match method {
            "sum" => values.iter().sum(),
            "mean" => values.iter().sum::<f64>() / values.len() as f64,
            "median" => median(values),
            "min" => values.iter().copied().fold(f64::INFINITY, f64::min),
            "max" => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            _ => unreachable!("checked by caller"),
        };
        Ok(Value::Number(result))
    }

    fn numeric_values(&self, view: &TableView, column: &str) -> Result<Vec<f64>, LangError> {
        let all = self.dataset.numeric_column(column).ok_or_else(|| {
            if self.dataset.text_column(column).is_some() {
                LangError::NotNumericColumn(column.to_string())
            } else {
                LangError::UnknownColumn(column.to_string())
            }
        })?;
        Ok(view.rows.iter().map(|&i| all[i]).collect())
    }

    fn text_values(&self, view: &TableView, column: &str) -> Result<Vec<&str>, LangError> {
        let all = self.dataset.text_column(column).ok_or_else(|| {
            if self.dataset.numeric_column(column).is_some() {
                LangError::NotTextColumn(column.to_string())
            } else {
                LangError::UnknownColumn(column.to_string())
            }
        })?;
        Ok(view.rows.iter().map(|&i| all[i]).collect())
    }

    fn filter_eq(
        &self,
        view: &TableView,
        column: &str,
        needle: &Value,
    ) -> Result<Value, LangError> {
        if let Some(all) = self.dataset.text_column(column) {
            let Value::Text(needle) = needle else {
                return Err(LangError::Type(format!(
                    "filter on '{}' requires a text value",
                    column
                )));
            };
            let rows = view
                .rows
                .iter()
                .copied()
                .filter(|&i| all[i].eq_ignore_ascii_case(needle))
                .collect();
            return Ok(Value::Table(TableView { rows }));
        }

        if let Some(all) = self.dataset.numeric_column(column) {
            let Value::Number(needle) = needle else {
                return Err(LangError::Type(format!(
                    "filter on '{}' requires a numeric value",
                    column
                )));
            };
            let rows = view
                .rows
                .iter()
                .copied()
                .filter(|&i| all[i] == *needle)
                .collect();
            return Ok(Value::Table(TableView { rows }));
        }

        Err(LangError::UnknownColumn(column.to_string()))
    }

    fn filter_cmp(
        &self,
        view: &TableView,
        column: &str,
        threshold: f64,
        greater: bool,
    ) -> Result<Value, LangError> {
        let all = self.dataset.numeric_column(column).ok_or_else(|| {
            if self.dataset.text_column(column).is_some() {
                LangError::NotNumericColumn(column.to_string())
            } else {
                LangError::UnknownColumn(column.to_string())
            }
        })?;
        let rows = view
            .rows
            .iter()
            .copied()
            .filter(|&i| {
                if greater {
                    all[i] > threshold
                } else {
                    all[i] < threshold
                }
            })
            .collect();
        Ok(Value::Table(TableView { rows }))
    }
}

fn method_name(method: &str) -> &'static str {
    match method {
        "sum" => "sum",
        "mean" => "mean",
        "median" => "median",
        "min" => "min",
        "max" => "max",
        "filter_gt" => "filter_gt",
        "filter_lt" => "filter_lt",
        _ => "method",
    }
}

fn expect_arity(method: &'static str, args: &[Value], arity: usize) -> Result<(), LangError> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(LangError::BadArity(method, arity))
    }
}

fn single_column_arg(method: &'static str, args: &[Value]) -> Result<String, LangError> {
    expect_arity(method, args, 1)?;
    column_name(&args[0])
}

fn column_name(value: &Value) -> Result<String, LangError> {
    match value {
        Value::Text(name) => Ok(name.clone()),
        other => Err(LangError::Type(format!(
            "expected a column name string, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Number(_) => "number",
        Value::Text(_) => "text",
        Value::List(_) => "list",
        Value::Table(_) => "table",
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        f64::midpoint(sorted[mid - 1], sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Most frequent value; ties break to the lexicographically smallest value so
/// results stay deterministic.
fn most_common(values: &[&str]) -> Option<Value> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.iter().copied() {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(value, _)| Value::Text(value.to_string()))
}
