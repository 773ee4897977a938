use pubrag_core::{Condition, FilterOp, FilterValue, Result};

fn literal(value: &FilterValue) -> String {
    match value {
        FilterValue::Int(v) => v.to_string(),
        FilterValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Render a conjunction as a LanceDB SQL predicate; `None` when empty.
pub fn conditions_to_sql(conditions: &[Condition]) -> Result<Option<String>> {
    let mut terms = Vec::with_capacity(conditions.len());
    for c in conditions {
        c.validate()?;
        let op = match c.op {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
        };
        terms.push(format!("{} {op} {}", c.field.name(), literal(&c.value)));
    }
    Ok((!terms.is_empty()).then(|| terms.join(" AND ")))
}

