use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::debug;

use crate::config::{MediaConfig, SignatureAlgorithm};

/// What the media host hands back after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    pub reference: String,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, body: Bytes, content_type: &str) -> anyhow::Result<UploadedMedia>;
    async fn delete(&self, reference: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct Cloudinary {
    client: Client,
    base: String,
    api_key: String,
    api_secret: String,
    algorithm: SignatureAlgorithm,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl Cloudinary {
    pub fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("build media http client")?;
        Ok(Self {
            client,
            base: format!(
                "{}/v1_1/{}",
                cfg.api_base.trim_end_matches('/'),
                cfg.cloud_name
            ),
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            algorithm: cfg.signature_algorithm,
        })
    }

    /// Signs the given parameters: sorted `k=v` pairs joined with `&`, followed
    /// by the API secret, hashed with the account's signature algorithm.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        match self.algorithm {
            SignatureAlgorithm::Sha1 => digest_hex::<Sha1>(&joined, &self.api_secret),
            SignatureAlgorithm::Sha256 => digest_hex::<Sha256>(&joined, &self.api_secret),
        }
    }
}

fn digest_hex<D: Digest>(payload: &str, secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_now() -> String {
    OffsetDateTime::now_utc().unix_timestamp().to_string()
}

#[async_trait]
impl MediaHost for Cloudinary {
    async fn upload(&self, body: Bytes, content_type: &str) -> anyhow::Result<UploadedMedia> {
        let timestamp = unix_now();
        let signature = self.sign(&[("timestamp", timestamp.as_str())]);
        let file = multipart::Part::bytes(body.to_vec())
            .file_name("upload")
            .mime_str(content_type)
            .context("media content type")?;
        let form = multipart::Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let res: UploadResponse = self
            .client
            .post(format!("{}/auto/upload", self.base))
            .multipart(form)
            .send()
            .await
            .context("media upload request")?
            .error_for_status()
            .context("media upload rejected")?
            .json()
            .await
            .context("media upload response")?;

        debug!(reference = %res.public_id, "media uploaded");
        Ok(UploadedMedia {
            url: res.secure_url,
            reference: res.public_id,
        })
    }

    async fn delete(&self, reference: &str) -> anyhow::Result<()> {
        let timestamp = unix_now();
        let signature = self.sign(&[("public_id", reference), ("timestamp", timestamp.as_str())]);
        let res: DestroyResponse = self
            .client
            .post(format!("{}/image/destroy", self.base))
            .form(&[
                ("public_id", reference),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .context("media destroy request")?
            .error_for_status()
            .context("media destroy rejected")?
            .json()
            .await
            .context("media destroy response")?;

        anyhow::ensure!(
            res.result == "ok",
            "media destroy of {reference} returned {}",
            res.result
        );
        debug!(%reference, "media deleted");
        Ok(())
    }
}
