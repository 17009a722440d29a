// Parameterized SQL statements

use crate::config::Placeholder;
use modelite_core::Value;
use std::fmt;

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlStatement {
    /// Statement without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            write!(f, " -- [")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", param)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Incremental statement writer; placeholders follow text order
#[derive(Debug)]
pub(crate) struct StatementBuilder {
    placeholder: Placeholder,
    sql: String,
    params: Vec<Value>,
}

impl StatementBuilder {
    pub fn new(placeholder: Placeholder) -> Self {
        Self {
            placeholder,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    /// Append a quoted identifier
    pub fn ident(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&quote_ident(name));
        self
    }

    /// Append a placeholder bound to `value`
    pub fn bind(&mut self, value: Value) -> &mut Self {
        self.params.push(value);
        match self.placeholder {
            Placeholder::QuestionMark => self.sql.push('?'),
            Placeholder::Numbered => {
                let n = self.params.len();
                self.sql.push_str(&format!("${}", n));
            }
        }
        self
    }

    pub fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape character of `LIKE` patterns. Backslash is avoided because MySQL
/// treats it as a string literal escape.
pub const LIKE_ESCAPE: char = '!';

/// Escape `LIKE` wildcards with [`LIKE_ESCAPE`] so `needle` matches literally
pub fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}
