use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::{JwtConfig, MAX_TTL_MINUTES};

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.clamp(1, MAX_TTL_MINUTES) as u64 * 60),
        }
    }

    pub fn sign(&self, user_id: Uuid, jti: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            jti,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, %jti, "jwt signed");
        Ok(token)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }

    /// Checks signature, issuer, audience and expiry.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation())?;
        debug!(user_id = %data.claims.sub, jti = %data.claims.jti, "jwt verified");
        Ok(data.claims)
    }

    /// Like `verify` but accepts expired tokens, so that their session entry
    /// can still be cleaned up.
    pub fn verify_ignoring_expiry(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = self.validation();
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        ttl_minutes: 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let keys = JwtKeys::new(&test_config());
        let user_id = Uuid::new_v4();
        let jti = Uuid::new_v4();
        let token = keys.sign(user_id, jti).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.jti, jti);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn oversized_ttl_is_clamped() {
        let keys = JwtKeys::new(&JwtConfig {
            ttl_minutes: i64::MAX,
            ..test_config()
        });
        let claims = keys.verify(&keys.sign(Uuid::new_v4(), Uuid::new_v4()).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TTL_MINUTES as usize * 60);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = JwtKeys::new(&test_config());
        let bad = JwtKeys::new(&JwtConfig {
            issuer: "bad-iss".into(),
            audience: "bad-aud".into(),
            ..test_config()
        });
        let token = good.sign(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let good = JwtKeys::new(&test_config());
        let other = JwtKeys::new(&JwtConfig {
            secret: "another-secret".into(),
            ..test_config()
        });
        let token = good.sign(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        assert!(other.verify(&token).is_err());
        assert!(other.verify_ignoring_expiry(&token).is_err());
    }

    #[test]
    fn expired_token_only_passes_lenient_check() {
        let keys = JwtKeys::new(&test_config());
        let claims = Claims {
            sub: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            iat: 1_000,
            exp: 2_000,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
        assert_eq!(keys.verify_ignoring_expiry(&token).unwrap().jti, claims.jti);
    }
}
