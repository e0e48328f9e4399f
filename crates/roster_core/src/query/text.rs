//! Textual query language.
//!
//! # Grammar
//! ```text
//! select <alias> from <Entity> [as] <alias>
//!   [where <cond> {and <cond>}]
//!   [order by <alias>.<field> [asc|desc]]
//!
//! cond    := <alias>.<field> ('=' | '<>' | '!=' | 'like') <literal>
//!          | <alias>.<field> is [not] null
//! literal := 'text, '' escapes a quote' | integer
//! ```
//!
//! Keywords are case-insensitive; entity names and field paths are not.
//!
//! # Invariants
//! - A parsed query is exactly equivalent to the `Criteria` a caller would
//!   build by hand for the same conditions.

use super::criteria::{Criteria, Predicate, QueryValue, SortOrder};
use super::{QueryError, QueryResult};
use crate::model::Entity;
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?P<text>'(?:[^']|'')*')|(?P<int>-?[0-9]+)|(?P<op><>|!=|=)|(?P<word>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*))",
    )
    .expect("valid token regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Word(String),
    Text(String),
    Integer(i64),
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

/// Parses `input` into a criteria over entity `E`.
///
/// # Errors
/// - `QueryError::Syntax` for malformed input (with byte position).
/// - `QueryError::UnknownEntity` when the `from` clause names another entity.
/// - `QueryError::UnknownAlias` when a path uses an undeclared alias.
/// - `QueryError::UnknownField` when a path is not mapped on `E`.
pub fn parse_query<E: Entity>(input: &str) -> QueryResult<Criteria<E>> {
    let tokens = tokenize(input)?;
    Parser {
        tokens,
        pos: 0,
        end: input.len(),
    }
    .parse::<E>()
}

fn tokenize(input: &str) -> QueryResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < input.len() {
        let rest = &input[offset..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }

        let Some(caps) = TOKEN_RE.captures(rest) else {
            return Err(syntax(
                offset + (rest.len() - trimmed.len()),
                "unexpected character or unterminated string",
            ));
        };

        let (kind, start) = if let Some(m) = caps.name("text") {
            let body = &m.as_str()[1..m.as_str().len() - 1];
            (TokenKind::Text(body.replace("''", "'")), m.start())
        } else if let Some(m) = caps.name("int") {
            let value = m
                .as_str()
                .parse::<i64>()
                .map_err(|_| syntax(offset + m.start(), "integer literal out of range"))?;
            (TokenKind::Integer(value), m.start())
        } else if let Some(m) = caps.name("op") {
            let kind = if m.as_str() == "=" {
                TokenKind::Equals
            } else {
                TokenKind::NotEquals
            };
            (kind, m.start())
        } else if let Some(m) = caps.name("word") {
            (TokenKind::Word(m.as_str().to_string()), m.start())
        } else {
            return Err(syntax(offset, "unrecognized token"));
        };

        tokens.push(Token {
            kind,
            position: offset + start,
        });
        offset += caps.get(0).map_or(rest.len(), |m| m.end());
    }

    Ok(tokens)
}

fn syntax(position: usize, message: impl Into<String>) -> QueryError {
    QueryError::Syntax {
        position,
        message: message.into(),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn parse<E: Entity>(mut self) -> QueryResult<Criteria<E>> {
        self.expect_keyword("select")?;
        let (alias, _) = self.expect_identifier("select alias")?;

        self.expect_keyword("from")?;
        let (entity, _) = self.expect_identifier("entity name")?;
        if entity != E::NAME {
            return Err(QueryError::UnknownEntity {
                expected: E::NAME,
                found: entity,
            });
        }

        self.eat_keyword("as");
        let (declared, _) = self.expect_identifier("entity alias")?;
        if declared != alias {
            return Err(QueryError::UnknownAlias {
                expected: declared,
                found: alias,
            });
        }

        let mut criteria = Criteria::<E>::new();
        if self.eat_keyword("where") {
            loop {
                criteria = criteria.filter(self.condition::<E>(&declared)?);
                if !self.eat_keyword("and") {
                    break;
                }
            }
        }

        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            let field = self.field_path::<E>(&declared)?;
            let order = if self.eat_keyword("desc") {
                SortOrder::Desc
            } else {
                self.eat_keyword("asc");
                SortOrder::Asc
            };
            criteria = criteria.order_by(field, order);
        }

        if let Some(token) = self.peek() {
            return Err(syntax(token.position, "unexpected trailing input"));
        }

        Ok(criteria)
    }

    fn condition<E: Entity>(&mut self, alias: &str) -> QueryResult<Predicate> {
        let field = self.field_path::<E>(alias)?;
        let position = self.position();

        match self.next().map(|token| token.kind) {
            Some(TokenKind::Equals) => Ok(Predicate::Eq {
                field,
                value: self.literal()?,
            }),
            Some(TokenKind::NotEquals) => Ok(Predicate::NotEq {
                field,
                value: self.literal()?,
            }),
            Some(TokenKind::Word(word)) if word.eq_ignore_ascii_case("like") => {
                match self.literal()? {
                    QueryValue::Text(pattern) => Ok(Predicate::Like { field, pattern }),
                    QueryValue::Integer(_) => {
                        Err(syntax(position, "`like` requires a string pattern"))
                    }
                }
            }
            Some(TokenKind::Word(word)) if word.eq_ignore_ascii_case("is") => {
                let negated = self.eat_keyword("not");
                self.expect_keyword("null")?;
                if negated {
                    Ok(Predicate::IsNotNull { field })
                } else {
                    Ok(Predicate::IsNull { field })
                }
            }
            _ => Err(syntax(
                position,
                "expected `=`, `<>`, `like` or `is [not] null`",
            )),
        }
    }

    fn field_path<E: Entity>(&mut self, alias: &str) -> QueryResult<String> {
        let position = self.position();
        let Some(TokenKind::Word(path)) = self.next().map(|token| token.kind) else {
            return Err(syntax(position, "expected <alias>.<field>"));
        };

        let Some((used_alias, field)) = path.split_once('.') else {
            return Err(syntax(position, "expected <alias>.<field>"));
        };
        if used_alias != alias {
            return Err(QueryError::UnknownAlias {
                expected: alias.to_string(),
                found: used_alias.to_string(),
            });
        }
        if E::column_for(field).is_none() {
            return Err(QueryError::UnknownField {
                entity: E::NAME,
                field: field.to_string(),
            });
        }

        Ok(field.to_string())
    }

    fn literal(&mut self) -> QueryResult<QueryValue> {
        let position = self.position();
        match self.next().map(|token| token.kind) {
            Some(TokenKind::Text(value)) => Ok(QueryValue::Text(value)),
            Some(TokenKind::Integer(value)) => Ok(QueryValue::Integer(value)),
            _ => Err(syntax(position, "expected a string or integer literal")),
        }
    }

    fn expect_identifier(&mut self, what: &str) -> QueryResult<(String, usize)> {
        let position = self.position();
        match self.next().map(|token| token.kind) {
            Some(TokenKind::Word(word)) if !word.contains('.') => Ok((word, position)),
            _ => Err(syntax(position, format!("expected {what}"))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> QueryResult<()> {
        if self.eat_keyword(keyword) {
            return Ok(());
        }
        Err(syntax(self.position(), format!("expected `{keyword}`")))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let matches = matches!(
            self.peek(),
            Some(Token { kind: TokenKind::Word(word), .. }) if word.eq_ignore_ascii_case(keyword)
        );
        if matches {
            self.pos += 1;
        }
        matches
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Byte offset of the next token, or end of input.
    fn position(&self) -> usize {
        self.peek().map_or(self.end, |token| token.position)
    }
}

#[cfg(test)]
mod tests {
    use super::parse_query;
    use crate::model::member::Member;
    use crate::model::team::Team;
    use crate::query::{Criteria, Predicate, QueryError, SortOrder};

    #[test]
    fn equality_query_matches_builder_form() {
        let parsed = parse_query::<Member>("select m from Member m where m.name = 'kim'").unwrap();
        let built = Criteria::<Member>::new().filter(Predicate::eq("name", "kim"));
        assert_eq!(parsed, built);
    }

    #[test]
    fn keywords_are_case_insensitive_and_as_is_optional() {
        let parsed =
            parse_query::<Member>("SELECT m FROM Member AS m WHERE m.name LIKE '%kim%'").unwrap();
        assert_eq!(
            parsed,
            Criteria::<Member>::new().filter(Predicate::like("name", "%kim%"))
        );
    }

    #[test]
    fn conjunction_null_checks_and_ordering() {
        let parsed = parse_query::<Member>(
            "select m from Member m where m.team.id = 3 and m.name <> 'x' and m.team_id is not null order by m.name desc",
        )
        .unwrap();
        let built = Criteria::<Member>::new()
            .filter(Predicate::eq("team.id", 3_i64))
            .filter(Predicate::not_eq("name", "x"))
            .filter(Predicate::is_not_null("team_id"))
            .order_by("name", SortOrder::Desc);
        assert_eq!(parsed, built);
    }

    #[test]
    fn doubled_quote_escapes_a_quote() {
        let parsed = parse_query::<Team>("select t from Team t where t.name = 'O''Brien'").unwrap();
        assert_eq!(
            parsed,
            Criteria::<Team>::new().filter(Predicate::eq("name", "O'Brien"))
        );
    }

    #[test]
    fn wrong_entity_is_rejected() {
        let err = parse_query::<Member>("select t from Team t").unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownEntity {
                expected: "Member",
                found: "Team".to_string()
            }
        );
    }

    #[test]
    fn unknown_alias_and_field_are_rejected() {
        let alias_err =
            parse_query::<Member>("select m from Member m where x.name = 'kim'").unwrap_err();
        assert!(matches!(alias_err, QueryError::UnknownAlias { found, .. } if found == "x"));

        let field_err =
            parse_query::<Member>("select m from Member m where m.age = 3").unwrap_err();
        assert!(matches!(field_err, QueryError::UnknownField { field, .. } if field == "age"));
    }

    #[test]
    fn syntax_errors_report_position() {
        let err = parse_query::<Member>("select m from Member m where m.name = 'kim").unwrap_err();
        assert_eq!(
            err,
            QueryError::Syntax {
                position: 38,
                message: "unexpected character or unterminated string".to_string()
            }
        );

        let trailing = parse_query::<Member>("select m from Member m extra").unwrap_err();
        assert!(matches!(trailing, QueryError::Syntax { position: 23, .. }));
    }
}
