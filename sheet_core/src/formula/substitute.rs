//! Variable substitution - replaces `@path` references with literal values

use super::FormulaError;
use std::collections::{BTreeMap, HashMap};

/// Read access to a numeric variable store
pub trait VariableLookup {
    fn lookup(&self, path: &str) -> Option<f64>;
}

impl VariableLookup for BTreeMap<String, f64> {
    fn lookup(&self, path: &str) -> Option<f64> {
        self.get(path).copied()
    }
}

impl VariableLookup for HashMap<String, f64> {
    fn lookup(&self, path: &str) -> Option<f64> {
        self.get(path).copied()
    }
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Split `@path` occurrences out of an expression
///
/// Returns `(start, end, path)` byte ranges covering the `@` and the path.
/// A trailing `.` is not part of the path, so `@level.` reads `level`.
fn variable_spans(expression: &str) -> Vec<(usize, usize, &str)> {
    let mut spans = Vec::new();
    let mut iter = expression.char_indices().peekable();

    while let Some((start, c)) = iter.next() {
        if c != '@' {
            continue;
        }
        let path_start = start + 1;
        let mut path_end = path_start;
        while let Some(&(index, next)) = iter.peek() {
            if !is_path_char(next) {
                break;
            }
            path_end = index + next.len_utf8();
            iter.next();
        }
        let path = expression[path_start..path_end].trim_end_matches(['.', '-']);
        if !path.is_empty() {
            spans.push((start, path_start + path.len(), path));
        }
    }

    spans
}

/// Render a value the way it appears in a substituted expression
pub fn format_value(value: f64) -> String {
    format!("{}", value)
}

/// Replace every `@path` with its value from `variables`
///
/// An unresolved path is an `UnknownVariable` error.
pub fn substitute_variables(
    expression: &str,
    variables: &dyn VariableLookup,
) -> Result<String, FormulaError> {
    let mut output = String::with_capacity(expression.len());
    let mut cursor = 0;

    for (start, end, path) in variable_spans(expression) {
        let value = variables
            .lookup(path)
            .ok_or_else(|| FormulaError::UnknownVariable(path.to_string()))?;
        output.push_str(&expression[cursor..start]);
        output.push_str(&format_value(value));
        cursor = end;
    }
    output.push_str(&expression[cursor..]);

    Ok(output)
}

/// Every variable path referenced by an expression, in first-seen order
pub fn referenced_variables(expression: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for (_, _, path) in variable_spans(expression) {
        if !paths.iter().any(|existing| existing == path) {
            paths.push(path.to_string());
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_substitutes_dotted_paths() {
        let variables = vars(&[("ability.strength.modifier", 3.0), ("level", 5.0)]);
        let result =
            substitute_variables("1d20 + @ability.strength.modifier + @level", &variables).unwrap();
        assert_eq!(result, "1d20 + 3 + 5");
    }

    #[test]
    fn test_negative_and_fractional_values() {
        let variables = vars(&[("a", -2.0), ("b", 0.5)]);
        assert_eq!(substitute_variables("@a - @b", &variables).unwrap(), "-2 - 0.5");
    }

    #[test]
    fn test_unknown_variable_is_error() {
        let variables = vars(&[("level", 1.0)]);
        let err = substitute_variables("@level + @missing.path", &variables).unwrap_err();
        assert!(matches!(err, FormulaError::UnknownVariable(ref p) if p == "missing.path"));
    }

    #[test]
    fn test_trailing_dot_not_in_path() {
        let variables = vars(&[("level", 4.0)]);
        assert_eq!(substitute_variables("(@level.)", &variables).unwrap(), "(4.)");
    }

    #[test]
    fn test_referenced_variables_deduplicated() {
        let refs = referenced_variables("@customVariable.a + @customVariable.a * @level");
        assert_eq!(refs, vec!["customVariable.a".to_string(), "level".to_string()]);
    }

    #[test]
    fn test_no_variables_passthrough() {
        let variables = BTreeMap::new();
        assert_eq!(substitute_variables("2 + 2", &variables).unwrap(), "2 + 2");
    }
}
