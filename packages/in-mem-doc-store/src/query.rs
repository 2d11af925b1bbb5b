//! Minimal query surface for scenario actions.
//!
//! Three forms are understood: `*` (or an empty string) matches every
//! document, `id:<value>` matches the document with exactly that id, and
//! any other text matches documents whose id or rendered payload contains
//! it.

use fixture_core::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Query<'a> {
    All,
    Id(&'a str),
    Text(&'a str),
}

pub(crate) fn parse(raw: &str) -> Query<'_> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Query::All;
    }
    match trimmed.strip_prefix("id:") {
        Some(id) => Query::Id(id),
        None => Query::Text(trimmed),
    }
}

pub(crate) fn matches(query: Query<'_>, entity: &Entity) -> bool {
    match query {
        Query::All => true,
        Query::Id(id) => entity.id == id,
        Query::Text(text) => entity.id.contains(text) || entity.payload.to_string().contains(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_star_and_empty_match_all() {
        assert_eq!(parse("*"), Query::All);
        assert_eq!(parse(""), Query::All);
        assert_eq!(parse("   "), Query::All);
    }

    #[test]
    fn parse_id_form() {
        assert_eq!(parse("id:order-7"), Query::Id("order-7"));
    }

    #[test]
    fn parse_free_text() {
        assert_eq!(parse("pending"), Query::Text("pending"));
    }

    #[test]
    fn id_query_is_exact() {
        let entity = Entity::keyed("order-7");
        assert!(matches(Query::Id("order-7"), &entity));
        assert!(!matches(Query::Id("order"), &entity));
    }

    #[test]
    fn text_query_searches_id_and_payload() {
        let entity = Entity::new("order-7", json!({ "status": "pending" }));
        assert!(matches(Query::Text("order"), &entity));
        assert!(matches(Query::Text("pending"), &entity));
        assert!(!matches(Query::Text("shipped"), &entity));
    }
}
