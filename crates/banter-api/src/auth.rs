use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

use banter_db::Database;
use banter_gateway::Dispatcher;

use crate::storage::FileStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub admins: AdminRoster,
    pub files: FileStore,
    pub public_base_url: String,
}

/// Identity claims as minted by the external provider. The email claim has
/// shipped under several spellings; all of them are accepted HERE and
/// nowhere else — the rest of the crate only ever sees [`Identity`].
#[derive(Debug, Deserialize)]
pub struct ProviderClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "emailAddress")]
    pub email_address: Option<String>,
    #[serde(default, rename = "primaryEmailAddress")]
    pub primary_email_address: Option<PrimaryEmailClaim>,
}

#[derive(Debug, Deserialize)]
pub struct PrimaryEmailClaim {
    #[serde(default, rename = "emailAddress")]
    pub email_address: Option<String>,
}

impl ProviderClaims {
    fn into_identity(self) -> Identity {
        let email = self
            .email
            .or(self.email_address)
            .or_else(|| self.primary_email_address.and_then(|p| p.email_address));
        Identity {
            subject: self.sub,
            email,
        }
    }
}

/// Normalized request identity, derived once per request from the token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: String,
    pub email: Option<String>,
}

/// Request extension carrying the identity. Always present; `None` means
/// the request is anonymous.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Option<Identity>);

/// Decode the Authorization header if one is present. Never rejects: a
/// missing, malformed, or expired token just makes the request anonymous.
pub async fn attach_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| decode_identity(token, &state.jwt_secret));

    req.extensions_mut().insert(CurrentIdentity(identity));
    next.run(req).await
}

/// Fail-closed: any fault while inspecting the token yields `None`, so a
/// broken token can never escalate into an authorization bypass.
pub fn decode_identity(token: &str, secret: &str) -> Option<Identity> {
    let data = decode::<ProviderClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    Some(data.claims.into_identity())
}

/// The set of identities allowed to administer channels, loaded from
/// configuration rather than baked into the binary.
#[derive(Debug, Default, Clone)]
pub struct AdminRoster {
    ids: HashSet<String>,
    emails: HashSet<String>,
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl AdminRoster {
    /// Parse comma-separated subject-id and email lists.
    pub fn from_lists(ids: &str, emails: &str) -> Self {
        Self {
            ids: split_list(ids).collect(),
            emails: split_list(emails).map(|e| e.to_lowercase()).collect(),
        }
    }

    /// True iff the identity's subject or email is on the roster.
    /// Anonymous is never admin.
    pub fn is_admin(&self, identity: Option<&Identity>) -> bool {
        let Some(identity) = identity else {
            return false;
        };
        if self.ids.contains(&identity.subject) {
            return true;
        }
        identity
            .email
            .as_deref()
            .is_some_and(|e| self.emails.contains(&e.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    const SECRET: &str = "test-secret";

    fn sign<T: Serialize>(claims: &T) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn roster_matches_by_id_and_email() {
        let roster = AdminRoster::from_lists("user_1, user_2", "Admin@Example.com");

        let by_id = Identity {
            subject: "user_1".into(),
            email: None,
        };
        let by_email = Identity {
            subject: "someone-else".into(),
            email: Some("admin@example.com".into()),
        };
        let neither = Identity {
            subject: "user_9".into(),
            email: Some("user9@example.com".into()),
        };

        assert!(roster.is_admin(Some(&by_id)));
        assert!(roster.is_admin(Some(&by_email)));
        assert!(!roster.is_admin(Some(&neither)));
        assert!(!roster.is_admin(None));
    }

    #[test]
    fn empty_roster_admits_nobody() {
        let roster = AdminRoster::from_lists("", "");
        let identity = Identity {
            subject: "user_1".into(),
            email: Some("a@b.c".into()),
        };
        assert!(!roster.is_admin(Some(&identity)));
    }

    #[test]
    fn email_claim_spellings_all_normalize() {
        #[derive(Serialize)]
        struct Flat {
            sub: String,
            email: String,
            exp: usize,
        }
        #[derive(Serialize)]
        struct Camel {
            sub: String,
            #[serde(rename = "emailAddress")]
            email_address: String,
            exp: usize,
        }
        #[derive(Serialize)]
        struct Nested {
            sub: String,
            #[serde(rename = "primaryEmailAddress")]
            primary: NestedInner,
            exp: usize,
        }
        #[derive(Serialize)]
        struct NestedInner {
            #[serde(rename = "emailAddress")]
            email_address: String,
        }

        let flat = sign(&Flat {
            sub: "u1".into(),
            email: "a@x.io".into(),
            exp: future_exp(),
        });
        let camel = sign(&Camel {
            sub: "u2".into(),
            email_address: "b@x.io".into(),
            exp: future_exp(),
        });
        let nested = sign(&Nested {
            sub: "u3".into(),
            primary: NestedInner {
                email_address: "c@x.io".into(),
            },
            exp: future_exp(),
        });

        assert_eq!(
            decode_identity(&flat, SECRET).unwrap().email.as_deref(),
            Some("a@x.io")
        );
        assert_eq!(
            decode_identity(&camel, SECRET).unwrap().email.as_deref(),
            Some("b@x.io")
        );
        assert_eq!(
            decode_identity(&nested, SECRET).unwrap().email.as_deref(),
            Some("c@x.io")
        );
    }

    #[test]
    fn bad_tokens_are_anonymous_not_errors() {
        assert!(decode_identity("not-a-token", SECRET).is_none());

        #[derive(Serialize)]
        struct Claims {
            sub: String,
            exp: usize,
        }
        let wrong_key = encode(
            &Header::default(),
            &Claims {
                sub: "u1".into(),
                exp: future_exp(),
            },
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();
        assert!(decode_identity(&wrong_key, SECRET).is_none());

        let expired = sign(&Claims {
            sub: "u1".into(),
            exp: 1_000,
        });
        assert!(decode_identity(&expired, SECRET).is_none());
    }
}
