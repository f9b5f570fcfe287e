use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `column:asc` / `column:desc`; anything malformed yields `None`
    pub fn parse(order: &str) -> Option<FilterOrderInfo> {
        let (column, direction) = order.split_once(':')?;
        if column.is_empty() || !column.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
            return None;
        }
        let sort = if direction.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else if direction.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            return None;
        };
        Some(FilterOrderInfo {
            column: column.to_string(),
            sort,
        })
    }

    pub fn generate(info: Option<&FilterOrderInfo>) -> String {
        match info {
            Some(i) => format!("ORDER BY \"{}\" {}", i.column, i.sort.to_sql()),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_column_and_direction() {
        let info = FilterOrder::parse("created_at:DESC").unwrap();
        assert_eq!(info.column, "created_at");
        assert_eq!(info.sort, SortDirection::Desc);
        assert_eq!(FilterOrder::generate(Some(&info)), "ORDER BY \"created_at\" DESC");
    }

    #[test]
    fn malformed_order_is_ignored() {
        assert!(FilterOrder::parse("created_at").is_none());
        assert!(FilterOrder::parse("created_at:sideways").is_none());
        assert!(FilterOrder::parse("name;drop:asc").is_none());
        assert!(FilterOrder::parse(":asc").is_none());
        assert_eq!(FilterOrder::generate(None), "");
    }
}
