use std::fmt;

use crate::record::Value;

use super::RecordScan;

/// Comparison applied by a `Term`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    GreaterThan,
    LessThan,
    /// SQL-style pattern match on text: `%` matches any run, `_` one character
    Like,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Equals => "=",
            CompareOp::GreaterThan => ">",
            CompareOp::LessThan => "<",
            CompareOp::Like => "LIKE",
        };
        f.write_str(op)
    }
}

/// `field op constant`
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub field: String,
    pub op: CompareOp,
    pub constant: Value,
}

impl Term {
    pub fn new(field: impl Into<String>, op: CompareOp, constant: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            constant: constant.into(),
        }
    }

    /// Evaluates the term against the current row. A missing field or a
    /// type mismatch evaluates to false.
    pub fn is_satisfied(&self, scan: &dyn RecordScan) -> bool {
        if !scan.has_field(&self.field) {
            return false;
        }
        let field_value = match &self.constant {
            Value::Int(_) => scan.get_int(&self.field).map(Value::Int),
            Value::Text(_) => scan.get_string(&self.field).map(Value::Text),
        };
        let Ok(field_value) = field_value else {
            return false;
        };

        match self.op {
            CompareOp::Equals => field_value == self.constant,
            CompareOp::GreaterThan => field_value > self.constant,
            CompareOp::LessThan => field_value < self.constant,
            CompareOp::Like => match (&field_value, &self.constant) {
                (Value::Text(text), Value::Text(pattern)) => like_match(text, pattern),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constant {
            Value::Int(v) => write!(f, "{} {} {}", self.field, self.op, v),
            Value::Text(s) => write!(f, "{} {} '{}'", self.field, self.op, s),
        }
    }
}

/// Conjunction of terms. The empty predicate accepts every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_term(term: Term) -> Self {
        Self { terms: vec![term] }
    }

    /// Adds a term, returning the extended predicate.
    pub fn and(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_satisfied(&self, scan: &dyn RecordScan) -> bool {
        self.terms.iter().all(|term| term.is_satisfied(scan))
    }

    /// Returns the constant `field` is required to equal, if any term says so.
    pub fn equates_with_constant(&self, field: &str) -> Option<&Value> {
        self.terms
            .iter()
            .find(|t| t.op == CompareOp::Equals && t.field.eq_ignore_ascii_case(field))
            .map(|t| &t.constant)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{}", term)?;
        }
        Ok(())
    }
}

fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matches[j]: text[..i] matches pattern[..j]
    let mut matches = vec![false; pattern.len() + 1];
    matches[0] = true;
    for j in 1..=pattern.len() {
        matches[j] = matches[j - 1] && pattern[j - 1] == '%';
    }

    for &c in &text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || matches[j],
                '_' => matches[j - 1],
                p => matches[j - 1] && p == c,
            };
        }
        matches = next;
    }

    matches[pattern.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, Schema};
    use crate::scan::RecordScanAdapter;

    #[test]
    fn test_like_match() {
        assert!(like_match("alice", "a%"));
        assert!(like_match("alice", "%ic%"));
        assert!(like_match("alice", "al_ce"));
        assert!(like_match("", "%"));
        assert!(!like_match("alice", "b%"));
        assert!(!like_match("alice", "al_e"));
        assert!(!like_match("", "_"));
    }

    #[test]
    fn test_predicate_conjunction() {
        let schema = Schema::builder().integer("id").varchar("name", 10).build();
        let record = Record::new(vec![Value::Int(5), Value::from("bob")]);
        let scan = RecordScanAdapter::new(&record, &schema);

        assert!(Predicate::new().is_satisfied(&scan));

        let pred = Predicate::from_term(Term::new("id", CompareOp::GreaterThan, 3))
            .and(Term::new("name", CompareOp::Like, "b%"));
        assert!(pred.is_satisfied(&scan));

        let pred = pred.and(Term::new("id", CompareOp::LessThan, 5));
        assert!(!pred.is_satisfied(&scan));

        let missing = Predicate::from_term(Term::new("age", CompareOp::Equals, 1));
        assert!(!missing.is_satisfied(&scan));

        let wrong_type = Predicate::from_term(Term::new("id", CompareOp::Equals, "5"));
        assert!(!wrong_type.is_satisfied(&scan));
    }

    #[test]
    fn test_equates_with_constant() {
        let pred = Predicate::from_term(Term::new("id", CompareOp::GreaterThan, 1))
            .and(Term::new("Name", CompareOp::Equals, "x"));
        assert_eq!(pred.equates_with_constant("name"), Some(&Value::from("x")));
        assert_eq!(pred.equates_with_constant("id"), None);
        assert_eq!(pred.to_string(), "id > 1 AND Name = 'x'");
    }
}
