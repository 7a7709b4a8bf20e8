use crate::user::UserId;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct JWTAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    exp: usize,
    sub: UserId,
}

impl JWTAuth {
    const DEFAULT_LIFETIME: Duration = Duration::from_secs(60 * 60);

    pub fn from_secret(secret: Vec<u8>) -> JWTAuth {
        Self::with_lifetime(secret, Self::DEFAULT_LIFETIME)
    }

    pub fn with_lifetime(secret: Vec<u8>, lifetime: Duration) -> JWTAuth {
        JWTAuth {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            lifetime,
        }
    }

    pub fn create_token(&self, user_id: UserId) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            exp: self.generate_exp(),
            sub: user_id,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn validate_token(&self, token: &str) -> Result<UserId, jsonwebtoken::errors::Error> {
        let claim =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(claim.claims.sub)
    }

    fn generate_exp(&self) -> usize {
        let now = Utc::now().timestamp().max(0) as u64;
        (now + self.lifetime.as_secs()) as usize
    }
}
