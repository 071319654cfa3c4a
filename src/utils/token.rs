use chrono::Duration;
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::error::Result;
use crate::middleware::auth::{AuthKeys, Claims};
use crate::models::user::User;

/// Issues an HS256 bearer token for `user`, valid for the configured TTL.
pub fn issue_token(keys: &AuthKeys, user: &User) -> Result<String> {
    let exp = super::time::now() + Duration::hours(keys.ttl_hours());
    let claims = Claims {
        sub: user.id.to_string(),
        exp: exp.timestamp() as usize,
        role: Some(user.role.clone()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(keys.secret().as_bytes()),
    )?;
    Ok(token)
}
