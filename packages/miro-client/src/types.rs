use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A record that can be identified across pages.
pub trait Record {
    fn id(&self) -> &str;
}

/// Opaque continuation token handed back by a paged endpoint.
///
/// For organization members this is the `cursor` body field; for boards it
/// is the absolute `links.next` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a raw token. Empty tokens mean "no further pages" and yield `None`.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of results plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self {
            items,
            next: next.and_then(Cursor::new),
        }
    }

    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// A licensed member of a Miro organization.
///
/// Fields are passed through verbatim; timestamps stay as the API's strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: Option<String>,
    pub active: Option<bool>,
    pub role: Option<String>,
    pub license: Option<String>,
    pub license_assigned_at: Option<String>,
    pub last_activity_at: Option<String>,
    #[serde(rename = "type")]
    pub member_type: Option<String>,
    #[serde(default)]
    pub admin_roles: Vec<serde_json::Value>,
}

impl Member {
    /// Active and holding a paid ("full") license.
    pub fn holds_full_license(&self) -> bool {
        self.active == Some(true) && self.license.as_deref() == Some("full")
    }

    /// Last activity, if present and parseable.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Admin roles joined for a single spreadsheet cell.
    pub fn admin_roles_display(&self) -> String {
        self.admin_roles
            .iter()
            .map(|role| match role {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Object(map) => match map.get("name").or(map.get("type")) {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    _ => role.to_string(),
                },
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Record for Member {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Board owner as embedded in a board listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardOwner {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A Miro board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: Option<String>,
    pub owner: Option<BoardOwner>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub view_link: Option<String>,
}

impl Record for Board {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Filters for the organization members listing.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberQuery {
    /// Page size, clamped to 1..=100.
    pub limit: u32,
    pub active: Option<bool>,
    pub license: Option<String>,
    pub role: Option<String>,
    pub emails: Vec<String>,
}

impl Default for MemberQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            active: None,
            license: None,
            role: None,
            emails: Vec::new(),
        }
    }
}

impl MemberQuery {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn emails(mut self, emails: Vec<String>) -> Self {
        self.emails = emails;
        self
    }

    /// Query parameters for one request, including the cursor when resuming.
    pub fn to_params(&self, cursor: Option<&Cursor>) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.clamp(1, 100).to_string())];
        if let Some(active) = self.active {
            params.push(("active", active.to_string()));
        }
        if let Some(license) = &self.license {
            params.push(("license", license.clone()));
        }
        if let Some(role) = &self.role {
            params.push(("role", role.clone()));
        }
        if !self.emails.is_empty() {
            params.push(("emails", self.emails.join(",")));
        }
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.as_str().to_string()));
        }
        params
    }
}

/// Wire shape of `GET /v2/orgs/{org_id}/members`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MembersResponse {
    pub data: Vec<Member>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Wire shape of `GET /v2/boards`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BoardsResponse {
    pub data: Vec<Board>,
    #[serde(default)]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_passes_fields_through() {
        let member: Member = serde_json::from_value(json!({
            "id": "3458764517517852417",
            "active": true,
            "email": "ada@example.com",
            "lastActivityAt": "2024-07-30T12:00:00Z",
            "license": "full",
            "licenseAssignedAt": "2023-01-05T09:30:00Z",
            "role": "organization_internal_user",
            "type": "organization_member",
            "adminRoles": [{"type": "content_admin", "name": "Content Admin"}, "billing"]
        }))
        .unwrap();

        assert_eq!(member.id, "3458764517517852417");
        assert_eq!(member.last_activity_at.as_deref(), Some("2024-07-30T12:00:00Z"));
        assert_eq!(member.member_type.as_deref(), Some("organization_member"));
        assert!(member.holds_full_license());
        assert_eq!(member.admin_roles_display(), "Content Admin, billing");
    }

    #[test]
    fn test_member_numeric_id_is_accepted() {
        let member: Member = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(member.id, "42");
        assert!(member.admin_roles.is_empty());
        assert!(!member.holds_full_license());
    }

    #[test]
    fn test_member_without_id_is_rejected() {
        let result: std::result::Result<Member, _> =
            serde_json::from_value(json!({"email": "ghost@example.com"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_members_response_requires_data() {
        let result: std::result::Result<MembersResponse, _> =
            serde_json::from_value(json!({"cursor": "abc"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_cursor_means_last_page() {
        let page: Page<Member> = Page::new(vec![], Some(String::new()));
        assert!(page.is_last());

        let page: Page<Member> = Page::new(vec![], Some("next".into()));
        assert_eq!(page.next.as_ref().map(Cursor::as_str), Some("next"));
    }

    #[test]
    fn test_query_params() {
        let query = MemberQuery::default()
            .with_limit(500)
            .active(true)
            .license("full")
            .emails(vec!["a@example.com".into(), "b@example.com".into()]);
        let cursor = Cursor::new("c1");
        let params = query.to_params(cursor.as_ref());

        assert_eq!(
            params,
            vec![
                ("limit", "100".to_string()),
                ("active", "true".to_string()),
                ("license", "full".to_string()),
                ("emails", "a@example.com,b@example.com".to_string()),
                ("cursor", "c1".to_string()),
            ]
        );
    }

    #[test]
    fn test_board_owner_name() {
        let board: Board = serde_json::from_value(json!({
            "id": "uXjVO123=",
            "name": "Roadmap",
            "owner": {"id": 3074457350000000000u64, "name": "Grace"},
            "createdAt": "2024-01-01T00:00:00Z",
            "modifiedAt": "2024-02-01T00:00:00Z",
            "viewLink": "https://miro.com/app/board/uXjVO123=/"
        }))
        .unwrap();
        assert_eq!(board.owner.and_then(|o| o.name).as_deref(), Some("Grace"));
    }
}
