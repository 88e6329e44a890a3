//! Formulas over theory atoms.
//!
//! A [`Formula`] is an immutable, reference-counted tree whose leaves are
//! [`Atom`]s. Cloning is cheap, and equal formulas compare (and hash) equal
//! structurally, which is what the normalizer and the diagram compiler use as
//! the identity of a sub-formula.
//!
//! Formulas print and parse in an SMT-LIB-like syntax:
//!
//! ```
//! use theory_dd::formula::Formula;
//!
//! let f = Formula::parse("(and (or x y) (=> y (<= (- a b) 3)))").unwrap();
//! assert_eq!(f.to_string(), "(and (or x y) (=> y (<= (- a b) 3)))");
//! assert_eq!(f.atoms().len(), 3);
//! ```

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TddError};

/// An integer term of a difference constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// The constant `0`, used for bounds on a single variable.
    Zero,
    Var(String),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Zero => write!(f, "0"),
            Term::Var(name) => write!(f, "{}", name),
        }
    }
}

/// Comparison relation of a difference constraint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rel {
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl Rel {
    fn symbol(self) -> &'static str {
        match self {
            Rel::Lt => "<",
            Rel::Le => "<=",
            Rel::Gt => ">",
            Rel::Ge => ">=",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(Rel::Lt),
            "<=" => Some(Rel::Le),
            ">" => Some(Rel::Gt),
            ">=" => Some(Rel::Ge),
            _ => None,
        }
    }
}

/// Difference constraint `lhs - rhs rel bound` over the integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiffAtom {
    pub lhs: Term,
    pub rhs: Term,
    pub rel: Rel,
    pub bound: i64,
}

impl DiffAtom {
    pub fn new(lhs: Term, rhs: Term, rel: Rel, bound: i64) -> Self {
        Self { lhs, rhs, rel, bound }
    }
}

impl Display for DiffAtom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.rhs {
            Term::Zero => write!(f, "({} {} {})", self.rel.symbol(), self.lhs, self.bound),
            rhs => write!(f, "({} (- {} {}) {})", self.rel.symbol(), self.lhs, rhs, self.bound),
        }
    }
}

/// An indivisible proposition: a boolean symbol or a theory constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Atom {
    Bool(String),
    Diff(DiffAtom),
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Atom::Bool(name) => write!(f, "{}", name),
            Atom::Diff(diff) => write!(f, "{}", diff),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    True,
    False,
    Atom(Atom),
    Not(Formula),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Formula, Formula),
    Iff(Formula, Formula),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Formula(Rc<Kind>);

impl Formula {
    pub fn new(kind: Kind) -> Self {
        Formula(Rc::new(kind))
    }

    pub fn kind(&self) -> &Kind {
        &self.0
    }

    pub fn top() -> Self {
        Self::new(Kind::True)
    }

    pub fn bottom() -> Self {
        Self::new(Kind::False)
    }

    pub fn atom(atom: Atom) -> Self {
        Self::new(Kind::Atom(atom))
    }

    /// Boolean symbol.
    pub fn var(name: impl Into<String>) -> Self {
        Self::atom(Atom::Bool(name.into()))
    }

    /// Difference constraint `lhs - rhs rel bound`.
    pub fn diff(lhs: Term, rhs: Term, rel: Rel, bound: i64) -> Self {
        Self::atom(Atom::Diff(DiffAtom::new(lhs, rhs, rel, bound)))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(f: Formula) -> Self {
        Self::new(Kind::Not(f))
    }

    pub fn and(args: impl IntoIterator<Item = Formula>) -> Self {
        Self::new(Kind::And(args.into_iter().collect()))
    }

    pub fn or(args: impl IntoIterator<Item = Formula>) -> Self {
        Self::new(Kind::Or(args.into_iter().collect()))
    }

    pub fn implies(lhs: Formula, rhs: Formula) -> Self {
        Self::new(Kind::Implies(lhs, rhs))
    }

    pub fn iff(lhs: Formula, rhs: Formula) -> Self {
        Self::new(Kind::Iff(lhs, rhs))
    }

    /// Conjunction of all the given formulas.
    pub fn big_and<'a>(formulas: impl IntoIterator<Item = &'a Formula>) -> Self {
        Self::and(formulas.into_iter().cloned())
    }

    pub fn is_true(&self) -> bool {
        matches!(self.kind(), Kind::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self.kind(), Kind::False)
    }

    pub fn children(&self) -> Vec<&Formula> {
        match self.kind() {
            Kind::True | Kind::False | Kind::Atom(_) => Vec::new(),
            Kind::Not(f) => vec![f],
            Kind::And(args) | Kind::Or(args) => args.iter().collect(),
            Kind::Implies(a, b) | Kind::Iff(a, b) => vec![a, b],
        }
    }

    /// Atoms of the formula, in order of first occurrence (left to right).
    pub fn atoms(&self) -> Vec<Atom> {
        let mut seen_nodes = HashSet::new();
        let mut seen_atoms = HashSet::new();
        let mut atoms = Vec::new();
        let mut stack = vec![self];
        while let Some(f) = stack.pop() {
            if !seen_nodes.insert(Rc::as_ptr(&f.0)) {
                continue;
            }
            if let Kind::Atom(atom) = f.kind() {
                if seen_atoms.insert(atom) {
                    atoms.push(atom.clone());
                }
            }
            // Reverse, so that the leftmost child is visited first.
            stack.extend(f.children().into_iter().rev());
        }
        atoms
    }

    /// Three-valued evaluation under a partial assignment of the atoms.
    ///
    /// Returns `None` when the value depends on unassigned atoms.
    pub fn evaluate(&self, value: &impl Fn(&Atom) -> Option<bool>) -> Option<bool> {
        match self.kind() {
            Kind::True => Some(true),
            Kind::False => Some(false),
            Kind::Atom(atom) => value(atom),
            Kind::Not(f) => f.evaluate(value).map(|b| !b),
            Kind::And(args) => {
                let mut result = Some(true);
                for arg in args {
                    match arg.evaluate(value) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => result = None,
                    }
                }
                result
            }
            Kind::Or(args) => {
                let mut result = Some(false);
                for arg in args {
                    match arg.evaluate(value) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => result = None,
                    }
                }
                result
            }
            Kind::Implies(a, b) => match (a.evaluate(value), b.evaluate(value)) {
                (Some(false), _) | (_, Some(true)) => Some(true),
                (Some(true), Some(false)) => Some(false),
                _ => None,
            },
            Kind::Iff(a, b) => match (a.evaluate(value), b.evaluate(value)) {
                (Some(x), Some(y)) => Some(x == y),
                _ => None,
            },
        }
    }

    /// Parse a single formula.
    pub fn parse(input: &str) -> Result<Formula> {
        let mut parser = Parser::new(input);
        let formula = parser.formula()?;
        if !parser.is_done() {
            return Err(parser.error("trailing input after formula"));
        }
        Ok(formula)
    }

    /// Parse a script of `(assert ...)` commands, returning the asserted formulas.
    ///
    /// Other commands (`set-logic`, `declare-fun`, `check-sat`, ...) are skipped.
    pub fn parse_script(input: &str) -> Result<Vec<Formula>> {
        let mut parser = Parser::new(input);
        let mut formulas = Vec::new();
        while !parser.is_done() {
            parser.expect(Token::Open)?;
            match parser.next_token() {
                Some(Token::Symbol(cmd)) if cmd == "assert" => {
                    formulas.push(parser.formula()?);
                    parser.expect(Token::Close)?;
                }
                Some(Token::Symbol(_)) => parser.skip_to_close()?,
                _ => return Err(parser.error("expected a command")),
            }
        }
        Ok(formulas)
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn nary(f: &mut Formatter<'_>, op: &str, args: &[&Formula]) -> std::fmt::Result {
            write!(f, "({}", op)?;
            for arg in args {
                write!(f, " {}", arg)?;
            }
            write!(f, ")")
        }

        match self.kind() {
            Kind::True => write!(f, "true"),
            Kind::False => write!(f, "false"),
            Kind::Atom(atom) => write!(f, "{}", atom),
            Kind::Not(_) => nary(f, "not", &self.children()),
            Kind::And(_) => nary(f, "and", &self.children()),
            Kind::Or(_) => nary(f, "or", &self.children()),
            Kind::Implies(_, _) => nary(f, "=>", &self.children()),
            Kind::Iff(_, _) => nary(f, "=", &self.children()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Symbol(String),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        let mut tokens = Vec::new();
        for line in input.lines() {
            let line = line.split(';').next().unwrap_or("");
            let spaced = line.replace('(', " ( ").replace(')', " ) ");
            for word in spaced.split_whitespace() {
                tokens.push(match word {
                    "(" => Token::Open,
                    ")" => Token::Close,
                    s => Token::Symbol(s.to_string()),
                });
            }
        }
        Self { tokens, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn error(&self, message: &str) -> TddError {
        TddError::Parse(format!("{} (at token {})", message, self.pos))
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next_token() {
            Some(token) if token == expected => Ok(()),
            _ => Err(self.error(&format!("expected {:?}", expected))),
        }
    }

    fn symbol(&mut self) -> Result<String> {
        match self.next_token() {
            Some(Token::Symbol(s)) => Ok(s),
            _ => Err(self.error("expected a symbol")),
        }
    }

    fn peek_close(&self) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Close))
    }

    fn skip_to_close(&mut self) -> Result<()> {
        let mut depth = 1;
        while depth > 0 {
            match self.next_token() {
                Some(Token::Open) => depth += 1,
                Some(Token::Close) => depth -= 1,
                Some(Token::Symbol(_)) => {}
                None => return Err(self.error("unbalanced parentheses")),
            }
        }
        Ok(())
    }

    fn formula(&mut self) -> Result<Formula> {
        match self.next_token() {
            Some(Token::Symbol(s)) => {
                if s == "true" {
                    Ok(Formula::top())
                } else if s == "false" {
                    Ok(Formula::bottom())
                } else if s.parse::<i64>().is_ok() {
                    Err(self.error("numeral in boolean position"))
                } else {
                    Ok(Formula::var(s))
                }
            }
            Some(Token::Open) => {
                let op = self.symbol()?;
                let formula = match op.as_str() {
                    "not" => Formula::not(self.formula()?),
                    "and" => Formula::and(self.arguments()?),
                    "or" => Formula::or(self.arguments()?),
                    "=>" => {
                        let lhs = self.formula()?;
                        Formula::implies(lhs, self.formula()?)
                    }
                    "=" => {
                        let lhs = self.formula()?;
                        Formula::iff(lhs, self.formula()?)
                    }
                    _ => match Rel::from_symbol(&op) {
                        Some(rel) => {
                            let (lhs, rhs) = self.difference()?;
                            let bound = self.bound()?;
                            Formula::diff(lhs, rhs, rel, bound)
                        }
                        None => return Err(self.error(&format!("unknown operator '{}'", op))),
                    },
                };
                self.expect(Token::Close)?;
                Ok(formula)
            }
            _ => Err(self.error("expected a formula")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Formula>> {
        let mut args = Vec::new();
        while !self.peek_close() {
            if self.is_done() {
                return Err(self.error("unbalanced parentheses"));
            }
            args.push(self.formula()?);
        }
        Ok(args)
    }

    fn term(&mut self) -> Result<Term> {
        let s = self.symbol()?;
        if s == "0" {
            Ok(Term::Zero)
        } else if s.parse::<i64>().is_ok() {
            Err(self.error("only the constant 0 may appear as a term"))
        } else {
            Ok(Term::Var(s))
        }
    }

    fn difference(&mut self) -> Result<(Term, Term)> {
        if matches!(self.tokens.get(self.pos), Some(Token::Open)) {
            self.pos += 1;
            if self.symbol()? != "-" {
                return Err(self.error("expected a difference '(- x y)'"));
            }
            let lhs = self.term()?;
            let rhs = self.term()?;
            self.expect(Token::Close)?;
            Ok((lhs, rhs))
        } else {
            Ok((self.term()?, Term::Zero))
        }
    }

    fn bound(&mut self) -> Result<i64> {
        let s = self.symbol()?;
        s.parse().map_err(|_| self.error(&format!("invalid integer bound '{}'", s)))
    }
}
