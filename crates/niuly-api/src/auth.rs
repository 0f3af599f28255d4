use secrecy::SecretString;

/// Account credentials plus the vehicle they unlock.
///
/// Immutable once handed to a client. A credential change builds a new
/// `Credentials` value (and a new client); fields are never patched in place.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
    vehicle_id: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        vehicle_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password,
            vehicle_id: vehicle_id.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Same vehicle, new account credentials.
    pub fn with_account(&self, username: impl Into<String>, password: SecretString) -> Self {
        Self::new(username, password, self.vehicle_id.clone())
    }
}

/// OAuth2 password grant, sent form-encoded to the token endpoint.
#[derive(serde::Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub grant_type: &'static str,
    pub username: &'a str,
    pub password: &'a str,
}

/// Token endpoint response. Only `access_token` matters; anything else is ignored.
#[derive(serde::Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
}
