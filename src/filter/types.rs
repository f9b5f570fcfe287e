use std::borrow::Cow;

/// Comparison operators of the query-string grammar (`col=<op>.<value>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Lt,
    In,
}

impl FilterOp {
    /// Split `eq.v`, `neq.v`, `gt.v`, `lt.v` or `in.(a,b)` into operator and
    /// decoded values. Anything else is not a filter.
    pub fn parse(raw: &str) -> Option<(FilterOp, Vec<String>)> {
        if let Some(list) = raw.strip_prefix("in.(").and_then(|r| r.strip_suffix(')')) {
            if list.is_empty() {
                return None;
            }
            let values = list.split(',').map(|v| decode_value(v.trim())).collect();
            return Some((FilterOp::In, values));
        }

        let (op, rest) = raw.split_once('.')?;
        let op = match op {
            "eq" => FilterOp::Eq,
            "neq" => FilterOp::Neq,
            "gt" => FilterOp::Gt,
            "lt" => FilterOp::Lt,
            _ => return None,
        };
        if rest.is_empty() {
            return None;
        }
        Some((op, vec![decode_value(rest)]))
    }
}

/// Clients percent-encode values before building the query string, so each
/// value is decoded once more. Malformed escapes are kept verbatim.
fn decode_value(value: &str) -> String {
    urlencoding::decode(value)
        .unwrap_or(Cow::Borrowed(value))
        .into_owned()
}

#[derive(Debug, Clone, Default)]
pub struct FilterData {
    pub select: Option<Vec<String>>,
    pub conditions: Vec<FilterWhereInfo>,
    pub order: Option<FilterOrderInfo>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// SQL text plus positional text parameters; `None` binds NULL
#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_operator() {
        assert_eq!(FilterOp::parse("eq.draft"), Some((FilterOp::Eq, vec!["draft".into()])));
        assert_eq!(FilterOp::parse("neq.x"), Some((FilterOp::Neq, vec!["x".into()])));
        assert_eq!(FilterOp::parse("gt.5"), Some((FilterOp::Gt, vec!["5".into()])));
        assert_eq!(FilterOp::parse("lt.2024-01-01"), Some((FilterOp::Lt, vec!["2024-01-01".into()])));
        assert_eq!(
            FilterOp::parse("in.(a, b,c)"),
            Some((FilterOp::In, vec!["a".into(), "b".into(), "c".into()]))
        );
    }

    #[test]
    fn values_are_decoded_again() {
        assert_eq!(
            FilterOp::parse("eq.jean%40wavy.fr"),
            Some((FilterOp::Eq, vec!["jean@wavy.fr".into()]))
        );
        assert_eq!(
            FilterOp::parse("in.(a%2Cb,c)"),
            Some((FilterOp::In, vec!["a,b".into(), "c".into()]))
        );
    }

    #[test]
    fn values_keep_inner_dots() {
        assert_eq!(FilterOp::parse("eq.1.5"), Some((FilterOp::Eq, vec!["1.5".into()])));
    }

    #[test]
    fn unrecognized_values_are_not_filters() {
        assert_eq!(FilterOp::parse("draft"), None);
        assert_eq!(FilterOp::parse("eq."), None);
        assert_eq!(FilterOp::parse("like.foo"), None);
        assert_eq!(FilterOp::parse("in.()"), None);
        assert_eq!(FilterOp::parse("in.(a"), None);
    }
}
