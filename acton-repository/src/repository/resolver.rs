//! Derived queries from method names
//!
//! A method name such as `findByUsernameAndAgeGreaterThan` is parsed once into
//! a [`DerivedQuery`]: an action, AND-combined predicates on descriptor
//! fields, optional ordering and an optional row cap. Binding positional
//! arguments turns it into a [`QuerySpecification`]. Every problem with the
//! name or the arguments is reported before storage is touched.
//!
//! ```text
//! name      := verb { subject-word } "By" criteria [ "OrderBy" ordering ]
//! verb      := find | read | get | query | search | stream | count | exists | delete | remove
//! criteria  := part { "And" part }
//! part      := Field [ GreaterThanEqual | GreaterThan | LessThanEqual | LessThan | In | Is | Equals ]
//! ordering  := Field ( Asc | Desc ) { Field ( Asc | Desc ) }
//! ```
//!
//! Subject words `Distinct`, `First<N>` and `Top<N>` are honored; any other
//! subject word (`All`, `Members`, ...) is ignored.
//!
//! # Example
//!
//! ```rust
//! use acton_repository::repository::{DerivedQuery, EntityDescriptor, QueryAction, Value};
//!
//! let member = EntityDescriptor::builder("Member", "id")
//!     .fields(["username", "age"])
//!     .build();
//!
//! let query = DerivedQuery::parse("findByUsernameAndAgeGreaterThan", &member).unwrap();
//! assert_eq!(query.action(), QueryAction::Find);
//! assert_eq!(query.predicates().len(), 2);
//!
//! let spec = query.bind(vec![Value::from("BBB"), Value::from(15_i64)]).unwrap();
//! assert_eq!(spec.to_string(), "username = 'BBB' AND age > 15");
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::descriptor::EntityDescriptor;
use super::error::RepositoryError;
use super::filter::{FilterCondition, FilterOperator};
use super::page::{Order, OrderDirection, Sort};
use super::specification::{LockMode, QuerySpecification};
use super::traits::RepositoryResult;
use super::value::Value;

/// CamelCase word: one capital followed by lowercase letters or digits
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z0-9]*").expect("word regex is valid"));

/// Operator suffixes, longest first so `GreaterThanEqual` wins over `GreaterThan`
const OPERATORS: &[(&[&str], FilterOperator)] = &[
    (&["Greater", "Than", "Equal"], FilterOperator::GreaterThanOrEqual),
    (&["Less", "Than", "Equal"], FilterOperator::LessThanOrEqual),
    (&["Greater", "Than"], FilterOperator::GreaterThan),
    (&["Less", "Than"], FilterOperator::LessThan),
    (&["Equals"], FilterOperator::Equal),
    (&["In"], FilterOperator::In),
    (&["Is"], FilterOperator::Equal),
];

/// What a derived query does with its matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryAction {
    /// `find`, `read`, `get`, `query`, `search`, `stream`
    Find,
    /// `count`
    Count,
    /// `exists`
    Exists,
    /// `delete`, `remove`
    Delete,
}

impl QueryAction {
    fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "find" | "read" | "get" | "query" | "search" | "stream" => Some(Self::Find),
            "count" => Some(Self::Count),
            "exists" => Some(Self::Exists),
            "delete" | "remove" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for QueryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find => write!(f, "find"),
            Self::Count => write!(f, "count"),
            Self::Exists => write!(f, "exists"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One criterion of a derived query, waiting for its argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPredicate {
    /// Descriptor field (snake_case)
    pub field: String,
    /// Comparison applied to the bound argument
    pub operator: FilterOperator,
}

/// A parsed method name
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedQuery {
    method_name: String,
    action: QueryAction,
    distinct: bool,
    lock: Option<LockMode>,
    read_only: bool,
    max_results: Option<u64>,
    predicates: Vec<DerivedPredicate>,
    sort: Sort,
}

impl DerivedQuery {
    /// Parse `method_name` against `descriptor`
    ///
    /// Fails with `MalformedQueryName` when the verb, a field or an operator
    /// cannot be recognized.
    pub fn parse(method_name: &str, descriptor: &EntityDescriptor) -> RepositoryResult<Self> {
        let malformed = |reason: String| RepositoryError::malformed_query_name(method_name, reason);

        let split = method_name
            .find(|c: char| c.is_ascii_uppercase())
            .ok_or_else(|| malformed("missing `By` clause".to_string()))?;
        let (verb, rest) = method_name.split_at(split);
        let action = QueryAction::from_verb(verb)
            .ok_or_else(|| malformed(format!("unknown query verb `{verb}`")))?;

        let words: Vec<&str> = WORD.find_iter(rest).map(|m| m.as_str()).collect();
        if words.concat() != rest {
            return Err(malformed(
                "expected CamelCase words after the verb".to_string(),
            ));
        }

        let by = words
            .iter()
            .position(|w| *w == "By")
            .ok_or_else(|| malformed("missing `By` clause".to_string()))?;
        let (subject, tail) = (&words[..by], &words[by + 1..]);

        let mut distinct = false;
        let mut max_results = None;
        let mut lock = None;
        let read_only = subject.windows(2).any(|pair| pair == ["Read", "Only"]);
        for word in subject {
            if *word == "Distinct" {
                distinct = true;
            } else if *word == "Lock" {
                lock = Some(LockMode::PessimisticWrite);
            } else if let Some(limit) = parse_limit(word) {
                let limit = limit.map_err(malformed)?;
                max_results = Some(limit);
            }
        }
        if action == QueryAction::Exists {
            max_results = Some(1);
        }

        let order_by = tail
            .windows(2)
            .position(|pair| pair == ["Order", "By"]);
        let (criteria, ordering) = match order_by {
            Some(i) => (&tail[..i], Some(&tail[i + 2..])),
            None => (tail, None),
        };

        let predicates = if criteria.is_empty() {
            if ordering.is_none() {
                return Err(malformed("no criteria after `By`".to_string()));
            }
            Vec::new()
        } else {
            parse_criteria(criteria, descriptor).map_err(malformed)?
        };

        let sort = match ordering {
            Some(ordering) => parse_ordering(ordering, descriptor).map_err(malformed)?,
            None => Sort::unsorted(),
        };

        tracing::trace!(
            method = method_name,
            entity = descriptor.entity_name(),
            predicates = predicates.len(),
            "Resolved derived query"
        );

        Ok(Self {
            method_name: method_name.to_string(),
            action,
            distinct,
            lock,
            read_only,
            max_results,
            predicates,
            sort,
        })
    }

    /// The method name this query was parsed from
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub const fn action(&self) -> QueryAction {
        self.action
    }

    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Write lock requested by a `Lock` subject word
    pub const fn lock(&self) -> Option<LockMode> {
        self.lock
    }

    /// Whether the subject says `ReadOnly`
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Row cap from `First<N>`/`Top<N>` (always 1 for `exists` queries)
    pub const fn max_results(&self) -> Option<u64> {
        self.max_results
    }

    pub fn predicates(&self) -> &[DerivedPredicate] {
        &self.predicates
    }

    pub const fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Bind positional arguments in declaration order
    ///
    /// Fails with `ArgumentMismatch` when the number of arguments differs from
    /// the number of criteria, when an `In` criterion gets a non-list argument,
    /// or when any other criterion gets a list or null argument.
    pub fn bind(&self, args: Vec<Value>) -> RepositoryResult<QuerySpecification> {
        if args.len() != self.predicates.len() {
            return Err(RepositoryError::argument_mismatch(
                &self.method_name,
                format!(
                    "expected {} argument(s), got {}",
                    self.predicates.len(),
                    args.len()
                ),
            ));
        }

        let mut spec = QuerySpecification::new().with_sort(self.sort.clone());
        for (predicate, arg) in self.predicates.iter().zip(args) {
            let fits = match (predicate.operator, &arg) {
                (FilterOperator::In, Value::List(_)) => true,
                (FilterOperator::In, _) | (_, Value::List(_) | Value::Null) => false,
                _ => true,
            };
            if !fits {
                return Err(RepositoryError::argument_mismatch(
                    &self.method_name,
                    format!(
                        "`{}` {} cannot take a {} argument",
                        predicate.field,
                        predicate.operator.code(),
                        arg.type_name()
                    ),
                ));
            }
            spec = spec.with_filter(FilterCondition::new(
                predicate.field.clone(),
                predicate.operator,
                arg,
            ));
        }
        if let Some(max) = self.max_results {
            spec = spec.with_max_results(max);
        }
        if self.distinct {
            spec = spec.distinct();
        }
        if let Some(lock) = self.lock {
            spec = spec.with_lock(lock);
        }
        if self.read_only {
            spec = spec.read_only();
        }
        Ok(spec)
    }
}

/// `First`, `Top`, `First3`, `Top10` -> row cap; other words -> `None`
fn parse_limit(word: &str) -> Option<Result<u64, String>> {
    let digits = word
        .strip_prefix("First")
        .or_else(|| word.strip_prefix("Top"))?;
    if digits.is_empty() {
        return Some(Ok(1));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(match digits.parse::<u64>() {
        Ok(0) | Err(_) => Err(format!("invalid row limit in `{word}`")),
        Ok(limit) => Ok(limit),
    })
}

fn parse_criteria(
    words: &[&str],
    descriptor: &EntityDescriptor,
) -> Result<Vec<DerivedPredicate>, String> {
    if words.contains(&"Or") {
        return Err("`Or` criteria are not supported".to_string());
    }
    words
        .split(|w| *w == "And")
        .map(|part| {
            if part.is_empty() {
                return Err("empty criterion around `And`".to_string());
            }
            let (field_words, operator) = OPERATORS
                .iter()
                .find(|(suffix, _)| part.len() > suffix.len() && part.ends_with(suffix))
                .map_or((part, FilterOperator::Equal), |(suffix, op)| {
                    (&part[..part.len() - suffix.len()], *op)
                });
            let field = resolve_field(field_words, descriptor)?;
            Ok(DerivedPredicate { field, operator })
        })
        .collect()
}

fn parse_ordering(words: &[&str], descriptor: &EntityDescriptor) -> Result<Sort, String> {
    let mut orders = Vec::new();
    let mut start = 0;
    for (i, word) in words.iter().enumerate() {
        let direction = match *word {
            "Asc" => OrderDirection::Ascending,
            "Desc" => OrderDirection::Descending,
            _ => continue,
        };
        if i == start {
            return Err("missing property before sort direction".to_string());
        }
        orders.push(Order {
            property: resolve_field(&words[start..i], descriptor)?,
            direction,
        });
        start = i + 1;
    }
    if orders.is_empty() || start != words.len() {
        return Err("`OrderBy` property must end with `Asc` or `Desc`".to_string());
    }
    Ok(Sort::from_orders(orders))
}

/// `["Created", "Date"]` -> `created_date`, which must be a descriptor field
fn resolve_field(words: &[&str], descriptor: &EntityDescriptor) -> Result<String, String> {
    let field = words
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    if descriptor.has_field(&field) {
        Ok(field)
    } else {
        Err(format!(
            "unknown property `{field}` on {}",
            descriptor.entity_name()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryErrorKind;

    fn member() -> EntityDescriptor {
        EntityDescriptor::builder("Member", "id")
            .fields(["username", "age"])
            .created_at("created_date")
            .relation("team", "team_id", "Team")
            .build()
    }

    fn parse(name: &str) -> RepositoryResult<DerivedQuery> {
        DerivedQuery::parse(name, &member())
    }

    #[test]
    fn test_parse_and_criteria() {
        let query = parse("findByUsernameAndAgeGreaterThan").unwrap();
        assert_eq!(
            query.predicates(),
            [
                DerivedPredicate {
                    field: "username".into(),
                    operator: FilterOperator::Equal
                },
                DerivedPredicate {
                    field: "age".into(),
                    operator: FilterOperator::GreaterThan
                },
            ]
        );
        assert_eq!(query.method_name(), "findByUsernameAndAgeGreaterThan");
    }

    #[test]
    fn test_operator_suffixes() {
        let cases = [
            ("findByAgeGreaterThanEqual", FilterOperator::GreaterThanOrEqual),
            ("findByAgeLessThanEqual", FilterOperator::LessThanOrEqual),
            ("findByAgeLessThan", FilterOperator::LessThan),
            ("findByAgeIn", FilterOperator::In),
            ("findByAgeIs", FilterOperator::Equal),
            ("findByAgeEquals", FilterOperator::Equal),
            ("findByAge", FilterOperator::Equal),
        ];
        for (name, operator) in cases {
            let query = parse(name).unwrap();
            assert_eq!(query.predicates()[0].operator, operator, "{name}");
            assert_eq!(query.predicates()[0].field, "age", "{name}");
        }
    }

    #[test]
    fn test_multi_word_fields() {
        let query = parse("findByTeamIdAndCreatedDateLessThan").unwrap();
        assert_eq!(query.predicates()[0].field, "team_id");
        assert_eq!(query.predicates()[1].field, "created_date");
        assert_eq!(query.predicates()[1].operator, FilterOperator::LessThan);
    }

    #[test]
    fn test_verbs() {
        assert_eq!(parse("readByAge").unwrap().action(), QueryAction::Find);
        assert_eq!(parse("streamByAge").unwrap().action(), QueryAction::Find);
        assert_eq!(parse("countByAge").unwrap().action(), QueryAction::Count);
        assert_eq!(parse("removeByAge").unwrap().action(), QueryAction::Delete);

        let exists = parse("existsByUsername").unwrap();
        assert_eq!(exists.action(), QueryAction::Exists);
        assert_eq!(exists.max_results(), Some(1));
    }

    #[test]
    fn test_subject_words() {
        let query = parse("findDistinctMembersByAge").unwrap();
        assert!(query.is_distinct());
        assert_eq!(query.max_results(), None);

        assert_eq!(parse("findFirstByAge").unwrap().max_results(), Some(1));
        assert_eq!(parse("findTop3ByAge").unwrap().max_results(), Some(3));
        assert_eq!(parse("findFirst10ByAge").unwrap().max_results(), Some(10));
        assert_eq!(parse("findFirstnameByAge").unwrap().max_results(), None);

        let err = parse("findTop0ByAge").unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::MalformedQueryName);
    }

    #[test]
    fn test_lock_and_read_only_subject_words() {
        let query = parse("findLockByUsername").unwrap();
        assert_eq!(query.lock(), Some(LockMode::PessimisticWrite));
        assert!(!query.is_read_only());
        let spec = query.bind(vec![Value::from("AAA")]).unwrap();
        assert_eq!(spec.hints.lock, Some(LockMode::PessimisticWrite));

        let query = parse("findReadOnlyByUsername").unwrap();
        assert!(query.is_read_only());
        assert_eq!(query.lock(), None);
        let spec = query.bind(vec![Value::from("AAA")]).unwrap();
        assert!(spec.hints.read_only);
        assert_eq!(spec.hints.lock, None);

        assert!(!parse("findOnlyByUsername").unwrap().is_read_only());
    }

    #[test]
    fn test_order_by() {
        let query = parse("findByAgeGreaterThanOrderByUsernameDescAgeAsc").unwrap();
        assert_eq!(query.predicates().len(), 1);
        assert_eq!(
            query.sort().orders(),
            [Order::desc("username"), Order::asc("age")]
        );

        let query = parse("findAllByOrderByCreatedDateDesc").unwrap();
        assert!(query.predicates().is_empty());
        assert_eq!(query.sort().orders(), [Order::desc("created_date")]);
    }

    #[test]
    fn test_malformed_names() {
        for name in [
            "findByNickname",
            "fetchByUsername",
            "findUsername",
            "findBy",
            "findByUsernameOrAge",
            "findByUsernameAndAndAge",
            "findByAgeOrderByUsername",
            "findByAgeOrderByDesc",
            "findBy_username",
            "find",
        ] {
            let err = parse(name).unwrap_err();
            assert_eq!(err.kind, RepositoryErrorKind::MalformedQueryName, "{name}");
            assert!(err.message.contains(name), "{name}");
        }
    }

    #[test]
    fn test_bind_arguments() {
        let query = parse("findTop2ByUsernameInAndAgeGreaterThanEqualOrderByAgeDesc").unwrap();
        let spec = query
            .bind(vec![Value::from(vec!["AAA", "BBB"]), Value::from(10_i64)])
            .unwrap();
        assert_eq!(spec.predicates[0].operator, FilterOperator::In);
        assert_eq!(spec.max_results, Some(2));
        assert_eq!(spec.sort.orders(), [Order::desc("age")]);
    }

    #[test]
    fn test_bind_argument_mismatch() {
        let query = parse("findByUsernameAndAgeGreaterThan").unwrap();
        let err = query.bind(vec![Value::from("BBB")]).unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ArgumentMismatch);
        assert!(err.message.contains("expected 2"));

        let query = parse("findByUsernameIn").unwrap();
        let err = query.bind(vec![Value::from("BBB")]).unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ArgumentMismatch);

        let query = parse("findByAge").unwrap();
        assert!(query.bind(vec![Value::from(vec![1_i64])]).is_err());
        assert!(query.bind(vec![Value::Null]).is_err());
    }
}
