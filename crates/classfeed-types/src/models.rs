use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::loose;

/// Canonical merged user record for one session.
///
/// Not persisted — reconstructed on every bootstrap from the stored token
/// and a fresh profile fetch. `unique_id` is never empty while the session
/// is authenticated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub unique_id: String,
    /// Everything the token and profile exposed: email, name parts, role,
    /// type, student id, confirmation flag, creation timestamp, ...
    pub fields: Map<String, Value>,
}

impl UserIdentity {
    /// Identity derived purely from decoded token claims.
    pub fn from_claims(claims: &Value) -> Option<Self> {
        let unique_id = loose::first_string(claims, &["id", "_id", "userId"])?.to_string();
        Some(Self {
            unique_id,
            fields: object_fields(claims),
        })
    }

    /// Identity derived from a server user record (e.g. a sign-in response).
    pub fn from_record(record: &Value) -> Option<Self> {
        let unique_id = loose::first_string(record, &["_id", "id"])?.to_string();
        Some(Self {
            unique_id,
            fields: object_fields(record),
        })
    }

    /// Merge token claims with a freshly fetched profile.
    ///
    /// Profile values win field-by-field. The unique id is picked by fixed
    /// precedence: profile `_id`, profile `id`, token `id`, token `_id` —
    /// first non-empty wins. None when no candidate resolves, so callers
    /// never authenticate an identity without an id.
    pub fn merged(claims: Option<&Value>, profile: &Value) -> Option<Self> {
        let unique_id = loose::first_string(profile, &["_id", "id"])
            .or_else(|| claims.and_then(|c| loose::first_string(c, &["id", "_id"])))?
            .to_string();

        let mut fields = claims.map(object_fields).unwrap_or_default();
        for (key, value) in object_fields(profile) {
            fields.insert(key, value);
        }

        Some(Self { unique_id, fields })
    }

    pub fn email(&self) -> Option<&str> {
        string_field(&self.fields, "email")
    }

    /// "firstname lastname", else `name`, else email, else the unique id.
    pub fn display_name(&self) -> String {
        name_from_fields(&self.fields)
            .or_else(|| self.email().map(str::to_string))
            .unwrap_or_else(|| self.unique_id.clone())
    }
}

/// Client-side session state, mutated only by the session reconciler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub identity: Option<UserIdentity>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Session {
    /// App-start state: signed out, bootstrap pending.
    pub fn initial() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: CommentAuthor,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Map a raw comment record. Returns None when no id resolves.
    pub fn from_record(record: &Value) -> Option<Self> {
        let id = loose::first_string(record, &["_id", "id"])?.to_string();
        let author_rec = record.get("createdBy").or_else(|| record.get("author"));
        let author = CommentAuthor {
            id: author_rec
                .and_then(|a| loose::first_string(a, &["_id", "id"]))
                .unwrap_or_default()
                .to_string(),
            display_name: author_rec
                .and_then(|a| loose::first_string(a, &["name", "email"]))
                .unwrap_or_default()
                .to_string(),
        };
        let created_at = loose::first_string(record, &["createdAt"])
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Some(Self {
            id,
            content: loose::first_string(record, &["content", "text"])
                .unwrap_or_default()
                .to_string(),
            author,
            created_at,
        })
    }
}

/// One feed post with viewer-relative like state.
///
/// Mutated in place by optimistic updates; superseded wholesale on each
/// full feed refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: String,
    pub content: String,
    pub author: PostAuthor,
    pub created_at_raw: String,
    pub liked_by_me: bool,
    pub like_count: usize,
    pub comments: Vec<Comment>,
    pub comment_count: usize,
    pub pending_like: bool,
}

impl FeedPost {
    /// Build a post from a raw server record, computing `liked_by_me` by
    /// scanning the post's like list for the viewer's id. Returns None when
    /// no id can be resolved (such a post could never be liked or deleted).
    pub fn from_record(record: &Value, viewer_id: Option<&str>) -> Option<Self> {
        let id = loose::first_string(record, &["_id", "id", "statusId"])?.to_string();

        let empty = Vec::new();
        let likes = record.get("like").and_then(Value::as_array).unwrap_or(&empty);
        let liked_by_me = viewer_id.is_some_and(|uid| {
            likes
                .iter()
                .any(|entry| loose::first_string(entry, &["_id", "id"]) == Some(uid))
        });

        let comments_raw = record
            .get("comment")
            .and_then(Value::as_array)
            .unwrap_or(&empty);
        let comments = comments_raw.iter().filter_map(Comment::from_record).collect();

        let author = record
            .get("createdBy")
            .map(|c| PostAuthor {
                id: loose::first_string(c, &["_id", "id"])
                    .unwrap_or_default()
                    .to_string(),
                email: loose::first_string(c, &["email"])
                    .unwrap_or_default()
                    .to_string(),
            })
            .unwrap_or_default();

        Some(Self {
            id,
            content: loose::first_string(record, &["content", "text"])
                .unwrap_or_default()
                .to_string(),
            author,
            created_at_raw: loose::first_string(record, &["createdAt"])
                .unwrap_or_default()
                .to_string(),
            liked_by_me,
            like_count: likes.len(),
            comments,
            comment_count: comments_raw.len(),
            pending_like: false,
        })
    }

    /// Ownership check for the delete affordance.
    pub fn owned_by(&self, viewer_id: &str) -> bool {
        !self.author.id.is_empty() && self.author.id == viewer_id
    }
}

/// A classmate from the enrollment-year roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMember {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub enrollment_year: Option<String>,
    pub student_id: Option<String>,
}

impl ClassMember {
    pub fn from_record(record: &Value) -> Option<Self> {
        let id = loose::first_string(record, &["_id", "id"])?.to_string();
        let fields = object_fields(record);
        let email = string_field(&fields, "email").unwrap_or_default().to_string();
        let display_name = name_from_fields(&fields).unwrap_or_else(|| email.clone());
        let education = record.get("education");
        Some(Self {
            id,
            email,
            display_name,
            enrollment_year: education.and_then(|e| loose::first_scalar(e, &["year"])),
            student_id: loose::first_scalar(record, &["studentId"])
                .or_else(|| education.and_then(|e| loose::first_scalar(e, &["studentId"]))),
        })
    }
}

fn object_fields(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn name_from_fields(fields: &Map<String, Value>) -> Option<String> {
    match (
        string_field(fields, "firstname"),
        string_field(fields, "lastname"),
    ) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first.to_string()),
        _ => string_field(fields, "name").map(str::to_string),
    }
}
