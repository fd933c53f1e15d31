use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// What a token may authorize. A token never works outside its own scope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TokenScope {
    Activation,
    Authentication,
    Refresh,
    PasswordReset,
}

impl TokenScope {
    pub const ALL: [TokenScope; 4] = [
        TokenScope::Activation,
        TokenScope::Authentication,
        TokenScope::Refresh,
        TokenScope::PasswordReset,
    ];

    /// Value stored in `tokens.scope`.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenScope::Activation => "activation",
            TokenScope::Authentication => "authentication",
            TokenScope::Refresh => "refresh",
            TokenScope::PasswordReset => "password-reset",
        }
    }
}

impl std::fmt::Display for TokenScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted token row. The plaintext is never part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRow {
    pub hash: Vec<u8>,
    pub user_id: i64,
    pub scope: TokenScope,
    pub expiry: OffsetDateTime,
}

/// Token handed to the caller exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expiry: OffsetDateTime,
    #[serde(skip)]
    pub hash: Vec<u8>,
    #[serde(skip)]
    pub user_id: i64,
    #[serde(skip)]
    pub scope: TokenScope,
}

impl Token {
    pub fn row(&self) -> TokenRow {
        TokenRow {
            hash: self.hash.clone(),
            user_id: self.user_id,
            scope: self.scope,
            expiry: self.expiry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_wire_names() {
        let names: Vec<_> = TokenScope::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            ["activation", "authentication", "refresh", "password-reset"]
        );
        assert_eq!(
            serde_json::to_string(&TokenScope::PasswordReset).unwrap(),
            "\"password-reset\""
        );
    }

    #[test]
    fn token_json_exposes_only_plaintext_and_expiry() {
        let token = Token {
            plaintext: "Y3Hf2Pxk9aDtkl2p0ZqfbQ".into(),
            expiry: time::macros::datetime!(2030-01-01 00:00 UTC),
            hash: vec![1, 2, 3],
            user_id: 9,
            scope: TokenScope::Refresh,
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token"], "Y3Hf2Pxk9aDtkl2p0ZqfbQ");
        assert_eq!(json["expiry"], "2030-01-01T00:00:00Z");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
