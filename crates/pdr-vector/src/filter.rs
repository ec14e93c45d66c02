//! SQL predicates selecting a scope's rows. The chunk store and the vector
//! store both filter through here, so they always see the same universe.

use pdr_core::SearchScope;

pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `None` when the scope selects nothing.
pub fn scope_filter(scope: &SearchScope) -> Option<String> {
    match scope {
        SearchScope::Document(id) => Some(format!("document_id = {}", quote(id))),
        SearchScope::Company(id) => Some(format!("company_id = {}", quote(id))),
        SearchScope::MultiDocument(ids) if ids.is_empty() => None,
        SearchScope::MultiDocument(ids) => {
            let list: Vec<String> = ids.iter().map(|id| quote(id)).collect();
            Some(format!("document_id IN ({})", list.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_per_scope() {
        assert_eq!(scope_filter(&SearchScope::Document("d1".into())).unwrap(), "document_id = 'd1'");
        assert_eq!(scope_filter(&SearchScope::Company("acme".into())).unwrap(), "company_id = 'acme'");
        assert_eq!(
            scope_filter(&SearchScope::MultiDocument(vec!["a".into(), "b".into()])).unwrap(),
            "document_id IN ('a', 'b')"
        );
        assert!(scope_filter(&SearchScope::MultiDocument(vec![])).is_none());
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote("o'brien"), "'o''brien'");
    }
}
