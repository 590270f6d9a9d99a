//! Parsed form of a search query
//!
//! The grammar is deliberately flat:
//!
//! ```text
//! query     := condition ((AND | OR)? condition)*
//! condition := (NOT | '-')? ( '(' query ')' | qualifier | text )
//! ```
//!
//! Operators are folded from left to right, so `a OR b c` reads as
//! `(a OR b) AND c`.

use super::tokenizer::{Token, TokenKind, tokenize};
use crate::core::{Level, Status, TicketType};
use crate::error::{BiletoError, Result};
use std::str::FromStr;

/// A user reference in `assignee:`, `requester:` and `involves:`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// The user running the search
    Me,
    Email(String),
}

/// Attributes accepted by `no:`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Assignee,
    Team,
    Label,
    Contract,
    Solution,
}

impl FromStr for Missing {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "assignee" => Ok(Self::Assignee),
            "team" => Ok(Self::Team),
            "label" | "labels" => Ok(Self::Label),
            "contract" | "contracts" => Ok(Self::Contract),
            "solution" => Ok(Self::Solution),
            _ => Err(()),
        }
    }
}

/// Which date `created:` and `updated:` look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Created,
    Updated,
}

/// Referenced entities, resolved by name or id when the query is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Organization,
    Team,
    Label,
    Contract,
}

/// Role of a user on a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Assignee,
    Requester,
    Involves,
}

/// A single condition on a ticket. Multiple values are OR-ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Text(String),
    Number(u64),
    Status(Vec<Status>),
    Type(Vec<TicketType>),
    Priority(Vec<Level>),
    Urgency(Vec<Level>),
    Impact(Vec<Level>),
    Actor(ActorRole, Vec<Actor>),
    Reference(Reference, Vec<String>),
    Missing(Vec<Missing>),
    /// Raw date filters, validated at parse time but evaluated at compile time
    Date(DateField, Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Condition(Condition),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// A parsed query; an empty query has no expression and matches everything
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub expr: Option<Expr>,
}

impl Query {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(Self::default());
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            end: input.chars().count(),
        };
        let expr = parser.sequence(0)?;
        Ok(Self { expr: Some(expr) })
    }

    pub const fn is_empty(&self) -> bool {
        self.expr.is_none()
    }
}

impl FromStr for Query {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

enum Operator {
    And,
    Or,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |t| t.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn sequence(&mut self, depth: usize) -> Result<Expr> {
        let mut expr = self.condition()?;

        loop {
            let operator = match self.peek().map(|t| &t.kind) {
                None => break,
                Some(TokenKind::CloseParen) if depth > 0 => break,
                Some(TokenKind::CloseParen) => {
                    return Err(BiletoError::query(self.position(), "unbalanced parenthesis ')'"));
                },
                Some(TokenKind::And) => {
                    self.pos += 1;
                    Operator::And
                },
                Some(TokenKind::Or) => {
                    self.pos += 1;
                    Operator::Or
                },
                Some(_) => Operator::And,
            };

            let rhs = self.condition()?;
            expr = match operator {
                Operator::And => Expr::And(Box::new(expr), Box::new(rhs)),
                Operator::Or => Expr::Or(Box::new(expr), Box::new(rhs)),
            };
        }

        Ok(expr)
    }

    fn condition(&mut self) -> Result<Expr> {
        let position = self.position();
        let Some(token) = self.next() else {
            return Err(BiletoError::query(position, "expected a condition at end of query"));
        };

        match token.kind {
            TokenKind::Not => Ok(Expr::Not(Box::new(self.condition()?))),
            TokenKind::OpenParen => {
                let inner = self.sequence(1)?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::CloseParen,
                        ..
                    }) => Ok(inner),
                    _ => Err(BiletoError::query(position, "unbalanced parenthesis '('")),
                }
            },
            TokenKind::CloseParen => Err(BiletoError::query(position, "expected a condition before ')'")),
            TokenKind::And | TokenKind::Or => {
                Err(BiletoError::query(position, "dangling operator"))
            },
            TokenKind::Text(text) => Ok(Expr::Condition(Condition::Text(text))),
            TokenKind::Number(number) => Ok(Expr::Condition(Condition::Number(number))),
            TokenKind::Qualifier { name, values } => {
                qualifier(&name, &values, position).map(Expr::Condition)
            },
        }
    }
}

fn parse_values<T>(name: &str, values: &[String], position: usize) -> Result<Vec<T>>
where
    T: FromStr,
{
    values
        .iter()
        .map(|v| {
            v.to_lowercase().parse::<T>().map_err(|_| {
                BiletoError::query(position, format!("invalid value '{v}' for '{name}:'"))
            })
        })
        .collect()
}

fn statuses(values: &[String], position: usize) -> Result<Vec<Status>> {
    let mut statuses = Vec::new();
    for value in values {
        match value.to_lowercase().as_str() {
            "open" => statuses.extend(Status::OPEN),
            "finished" => statuses.extend(Status::FINISHED),
            other => statuses.extend(parse_values::<Status>(
                "status",
                &[other.to_string()],
                position,
            )?),
        }
    }
    statuses.dedup();
    Ok(statuses)
}

fn actors(values: &[String]) -> Vec<Actor> {
    values
        .iter()
        .map(|v| {
            if v.eq_ignore_ascii_case("@me") {
                Actor::Me
            } else {
                Actor::Email(v.to_lowercase())
            }
        })
        .collect()
}

fn qualifier(name: &str, values: &[String], position: usize) -> Result<Condition> {
    let condition = match name {
        "status" => Condition::Status(statuses(values, position)?),
        "type" => Condition::Type(parse_values(name, values, position)?),
        "priority" => Condition::Priority(parse_values(name, values, position)?),
        "urgency" => Condition::Urgency(parse_values(name, values, position)?),
        "impact" => Condition::Impact(parse_values(name, values, position)?),
        "assignee" => Condition::Actor(ActorRole::Assignee, actors(values)),
        "requester" => Condition::Actor(ActorRole::Requester, actors(values)),
        "involves" => Condition::Actor(ActorRole::Involves, actors(values)),
        "org" | "organization" => Condition::Reference(Reference::Organization, values.to_vec()),
        "team" => Condition::Reference(Reference::Team, values.to_vec()),
        "label" => Condition::Reference(Reference::Label, values.to_vec()),
        "contract" => Condition::Reference(Reference::Contract, values.to_vec()),
        "no" => Condition::Missing(parse_values(name, values, position)?),
        "created" | "updated" => {
            let today = chrono::Utc::now().date_naive();
            if let Some(invalid) = values
                .iter()
                .find(|v| super::DateRange::parse(v, today).is_none())
            {
                return Err(BiletoError::query(
                    position,
                    format!("invalid date '{invalid}' for '{name}:'"),
                ));
            }
            let field = if name == "created" {
                DateField::Created
            } else {
                DateField::Updated
            };
            Condition::Date(field, values.to_vec())
        },
        _ => {
            return Err(BiletoError::query(
                position,
                format!("unknown qualifier '{name}:'"),
            ));
        },
    };
    Ok(condition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Expr {
        Expr::Condition(Condition::Text(s.to_string()))
    }

    fn and(a: Expr, b: Expr) -> Expr {
        Expr::And(Box::new(a), Box::new(b))
    }

    fn or(a: Expr, b: Expr) -> Expr {
        Expr::Or(Box::new(a), Box::new(b))
    }

    fn parse(input: &str) -> Expr {
        Query::parse(input).unwrap().expr.unwrap()
    }

    fn error_position(input: &str) -> usize {
        match Query::parse(input) {
            Err(BiletoError::Query { position, .. }) => position,
            other => panic!("expected a query error for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_query() {
        assert!(Query::parse("").unwrap().is_empty());
        assert!(Query::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_left_to_right_without_precedence() {
        assert_eq!(parse("a OR b c"), and(or(text("a"), text("b")), text("c")));
        assert_eq!(parse("a b OR c"), or(and(text("a"), text("b")), text("c")));
        assert_eq!(parse("a OR (b c)"), or(text("a"), and(text("b"), text("c"))));
    }

    #[test]
    fn test_negation() {
        assert_eq!(
            parse("-a NOT (b OR c)"),
            and(
                Expr::Not(Box::new(text("a"))),
                Expr::Not(Box::new(or(text("b"), text("c"))))
            )
        );
        assert_eq!(parse("NOT NOT a"), Expr::Not(Box::new(Expr::Not(Box::new(text("a"))))));
    }

    #[test]
    fn test_qualifiers() {
        assert_eq!(
            parse("status:open"),
            Expr::Condition(Condition::Status(Status::OPEN.to_vec()))
        );
        assert_eq!(
            parse("status:in-progress,resolved"),
            Expr::Condition(Condition::Status(vec![Status::InProgress, Status::Resolved]))
        );
        assert_eq!(
            parse("priority:HIGH"),
            Expr::Condition(Condition::Priority(vec![Level::High]))
        );
        assert_eq!(
            parse("assignee:@me,Bob@Example.com"),
            Expr::Condition(Condition::Actor(
                ActorRole::Assignee,
                vec![Actor::Me, Actor::Email("bob@example.com".to_string())]
            ))
        );
        assert_eq!(
            parse("org:\"Acme Corp\""),
            Expr::Condition(Condition::Reference(
                Reference::Organization,
                vec!["Acme Corp".to_string()]
            ))
        );
        assert_eq!(
            parse("no:assignee,solution"),
            Expr::Condition(Condition::Missing(vec![Missing::Assignee, Missing::Solution]))
        );
        assert_eq!(parse("#12"), Expr::Condition(Condition::Number(12)));
        assert!(matches!(
            parse("created:last-7"),
            Expr::Condition(Condition::Date(DateField::Created, _))
        ));
    }

    #[test]
    fn test_errors_report_position() {
        assert_eq!(error_position("printer foo:bar"), 8);
        assert_eq!(error_position("status:closing"), 0);
        assert_eq!(error_position("a updated:someday"), 2);
        assert_eq!(error_position("no:idea"), 0);
        assert_eq!(error_position("(a OR b"), 0);
        assert_eq!(error_position("a b)"), 3);
        assert_eq!(error_position("()"), 1);
        assert_eq!(error_position("a AND"), 5);
        assert_eq!(error_position("OR a"), 0);
        assert_eq!(error_position("a OR OR b"), 5);
        assert_eq!(error_position("NOT"), 3);
    }

    #[test]
    fn test_out_of_range_date_is_a_query_error() {
        assert_eq!(error_position("created:last-100000000"), 0);
        assert_eq!(error_position("printer updated:last-99999999999"), 8);
    }
}
