use crate::SinkError;
use regex::Regex;
use std::fmt;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$";

/// Destination table, validated as `table` or `schema.table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentifier {
    schema: Option<String>,
    table: String,
}

impl TableIdentifier {
    pub fn parse(raw: &str) -> Result<Self, SinkError> {
        let regex = Regex::new(IDENTIFIER_PATTERN)
            .map_err(|err| SinkError::InvalidConfig(format!("table identifier grammar: {err}")))?;
        if !regex.is_match(raw) {
            return Err(SinkError::InvalidConfig(format!(
                "invalid table identifier {raw:?}: expected identifier or schema.identifier \
                 (letters, digits, underscore; not starting with a digit)"
            )));
        }
        let identifier = match raw.split_once('.') {
            Some((schema, table)) => Self {
                schema: Some(schema.to_string()),
                table: table.to_string(),
            },
            None => Self {
                schema: None,
                table: raw.to_string(),
            },
        };
        Ok(identifier)
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Double-quoted form safe to splice into SQL.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote(schema), quote(&self.table)),
            None => quote(&self.table),
        }
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.table),
            None => f.write_str(&self.table),
        }
    }
}

fn quote(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}
