//! Column discovery from stored creation statements.

/// Leading keywords of table-level constraints, which name no column.
const CONSTRAINT_KEYWORDS: [&str; 5] = ["PRIMARY", "UNIQUE", "CHECK", "FOREIGN", "CONSTRAINT"];

/// Column names declared by a `CREATE TABLE` statement, in order.
///
/// Returns an empty list when the statement has no column list.
pub fn creation_string_columns(sql: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (sql.find('('), sql.rfind(')')) else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }
    split_top_level(&sql[open + 1..close])
        .into_iter()
        .filter_map(|field| {
            let name = field.split_whitespace().next()?;
            if CONSTRAINT_KEYWORDS
                .iter()
                .any(|k| name.eq_ignore_ascii_case(k))
            {
                return None;
            }
            let name = name.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']' | '\''));
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Splits on commas outside of parentheses.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                fields.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(body[start..].trim());
    fields.retain(|f| !f.is_empty());
    fields
}
