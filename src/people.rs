//! Conversion of people into schema.org `Person` / `Organization` objects.
//!
//! The citation builder treats this as a collaborator: it hands over the raw
//! author list together with an empty context and reads back the `author`
//! property. [`SchemaPeople`] is the stock implementation.

use crate::entry::Person;
use serde_json::{json, Map, Value};

/// A CodeMeta property bag that people are sorted into.
pub type Context = Map<String, Value>;

/// Sorts a list of people into CodeMeta properties.
pub trait AuthorParser {
    /// Adds people from `people` to `context` and returns it.
    ///
    /// Properties that would hold no people must not be inserted.
    fn parse_people(&self, people: &[Person], context: Context) -> Context;
}

/// Role codes and the CodeMeta property each one feeds.
const ROLE_PROPERTIES: &[(&str, &str)] = &[
    ("aut", "author"),
    ("ctb", "contributor"),
    ("cph", "copyrightHolder"),
    ("fnd", "funder"),
    ("cre", "maintainer"),
];

const ORCID_BASE_URL: &str = "https://orcid.org/";

/// Default [`AuthorParser`] producing schema.org objects.
///
/// People without any role count as authors, which is how names on a
/// bibliographic entry are usually declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaPeople;

impl AuthorParser for SchemaPeople {
    fn parse_people(&self, people: &[Person], mut context: Context) -> Context {
        for (role, property) in ROLE_PROPERTIES {
            let members: Vec<Value> = people
                .iter()
                .filter(|p| p.has_role(role) || (*role == "aut" && p.role.is_empty()))
                .map(person_to_schema)
                .collect();

            if !members.is_empty() {
                context.insert(property.to_string(), Value::Array(members));
            }
        }
        context
    }
}

/// Converts one person to a schema.org object.
///
/// A person without a family name is an organization named by its given
/// name(s), e.g. `person("R Core Team")`.
pub fn person_to_schema(person: &Person) -> Value {
    let given = person.given.join(" ");

    let Some(family) = &person.family else {
        return json!({ "@type": "Organization", "name": given });
    };

    let mut object = Map::new();
    object.insert("@type".into(), json!("Person"));
    if !given.is_empty() {
        object.insert("givenName".into(), json!(given));
    }
    object.insert("familyName".into(), json!(family));
    if let Some(email) = &person.email {
        object.insert("email".into(), json!(email));
    }
    if let Some(orcid) = person.comment.get("ORCID") {
        let id = if orcid.starts_with(ORCID_BASE_URL) {
            orcid.clone()
        } else {
            format!("{}{}", ORCID_BASE_URL, orcid)
        };
        object.insert("@id".into(), json!(id));
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(given: &str, family: Option<&str>, roles: &[&str]) -> Person {
        Person {
            given: given.split_whitespace().map(String::from).collect(),
            family: family.map(String::from),
            role: roles.iter().map(|r| r.to_string()).collect(),
            ..Person::default()
        }
    }

    #[test]
    fn test_parse_people_empty_adds_no_keys() {
        let context = SchemaPeople.parse_people(&[], Context::new());
        assert!(context.is_empty());
    }

    #[test]
    fn test_parse_people_roleless_are_authors() {
        // Given: two people declared without roles
        let people = vec![
            person("Jane", Some("Doe"), &[]),
            person("John Q.", Some("Public"), &[]),
        ];

        // When: we parse them
        let context = SchemaPeople.parse_people(&people, Context::new());

        // Then: both are authors, in order
        assert_eq!(
            context["author"],
            json!([
                {"@type": "Person", "givenName": "Jane", "familyName": "Doe"},
                {"@type": "Person", "givenName": "John Q.", "familyName": "Public"}
            ])
        );
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn test_parse_people_sorts_by_role() {
        let people = vec![
            person("Ann", Some("Author"), &["aut", "cre"]),
            person("Cal", Some("Contrib"), &["ctb"]),
            person("ACME Corp", None, &["cph", "fnd"]),
        ];

        let context = SchemaPeople.parse_people(&people, Context::new());

        assert_eq!(context["author"].as_array().unwrap().len(), 1);
        assert_eq!(context["maintainer"][0]["familyName"], "Author");
        assert_eq!(context["contributor"][0]["familyName"], "Contrib");
        assert_eq!(
            context["copyrightHolder"],
            json!([{"@type": "Organization", "name": "ACME Corp"}])
        );
        assert_eq!(context["funder"][0]["name"], "ACME Corp");
    }

    #[test]
    fn test_person_to_schema_email_and_orcid() {
        let mut p = person("Jane", Some("Doe"), &[]);
        p.email = Some("jane@example.org".to_string());
        p.comment
            .insert("ORCID".to_string(), "0000-0002-1825-0097".to_string());

        assert_eq!(
            person_to_schema(&p),
            json!({
                "@type": "Person",
                "givenName": "Jane",
                "familyName": "Doe",
                "email": "jane@example.org",
                "@id": "https://orcid.org/0000-0002-1825-0097"
            })
        );
    }

    #[test]
    fn test_person_to_schema_orcid_url_kept() {
        let mut p = person("Jane", Some("Doe"), &[]);
        p.comment.insert(
            "ORCID".to_string(),
            "https://orcid.org/0000-0002-1825-0097".to_string(),
        );
        assert_eq!(
            person_to_schema(&p)["@id"],
            "https://orcid.org/0000-0002-1825-0097"
        );
    }

    #[test]
    fn test_person_to_schema_family_only() {
        let p = person("", Some("Hadley"), &[]);
        assert_eq!(
            person_to_schema(&p),
            json!({"@type": "Person", "familyName": "Hadley"})
        );
    }
}
