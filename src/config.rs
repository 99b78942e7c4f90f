use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Upper bound for `JWT_TTL_MINUTES`: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Digest the media host checks request signatures with. Accounts start on
/// SHA-1 and can be switched to SHA-256.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => anyhow::bail!("unknown signature algorithm {other}"),
        }
    }
}

/// Cloudinary account used to host profile images.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
    pub signature_algorithm: SignatureAlgorithm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    /// Emails allowed to self-register with the admin flag set.
    pub admin_emails: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(1126);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "userhub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "userhub-users".into()),
            ttl_minutes: parse_ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref()),
        };
        let media = MediaConfig {
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME")
                .context("CLOUDINARY_CLOUD_NAME is not set")?,
            api_key: std::env::var("CLOUDINARY_API_KEY").context("CLOUDINARY_API_KEY is not set")?,
            api_secret: std::env::var("CLOUDINARY_API_SECRET")
                .context("CLOUDINARY_API_SECRET is not set")?,
            api_base: std::env::var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|_| "https://api.cloudinary.com".into()),
            signature_algorithm: match std::env::var("CLOUDINARY_SIGNATURE_ALGORITHM") {
                Ok(v) => v.parse().context("CLOUDINARY_SIGNATURE_ALGORITHM")?,
                Err(_) => SignatureAlgorithm::default(),
            },
        };
        let admin_emails = parse_admin_emails(&std::env::var("ADMIN_EMAILS").unwrap_or_default());
        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            media,
            admin_emails,
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|e| e == email)
    }
}

/// Token lifetime in minutes, defaulting to a week and kept within
/// `1..=MAX_TTL_MINUTES`.
fn parse_ttl_minutes(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(60 * 24 * 7)
        .clamp(1, MAX_TTL_MINUTES)
}

fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_emails_are_trimmed_and_lowercased() {
        let emails = parse_admin_emails(" Root@Example.com, ,ops@example.com ");
        assert_eq!(emails, vec!["root@example.com", "ops@example.com"]);
    }

    #[test]
    fn empty_admin_emails() {
        assert!(parse_admin_emails("").is_empty());
    }

    #[test]
    fn ttl_defaults_and_clamps() {
        assert_eq!(parse_ttl_minutes(None), 60 * 24 * 7);
        assert_eq!(parse_ttl_minutes(Some("garbage")), 60 * 24 * 7);
        assert_eq!(parse_ttl_minutes(Some(" 30 ")), 30);
        assert_eq!(parse_ttl_minutes(Some("0")), 1);
        assert_eq!(parse_ttl_minutes(Some("-5")), 1);
        assert_eq!(
            parse_ttl_minutes(Some(&i64::MAX.to_string())),
            MAX_TTL_MINUTES
        );
    }

    #[test]
    fn signature_algorithm_parses() {
        assert_eq!("sha1".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha1);
        assert_eq!(" SHA256 ".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Sha256);
        assert!("md5".parse::<SignatureAlgorithm>().is_err());
        assert_eq!(SignatureAlgorithm::default(), SignatureAlgorithm::Sha1);
    }
}
