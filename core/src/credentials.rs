use std::fmt;

use alloy::primitives::ChainId;
use alloy_signer_aws::AwsSigner;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::future::ProvideCredentials as ProvideCredentialsFuture;
use aws_sdk_kms::{
    config::{Credentials, ProvideCredentials},
    primitives::Blob,
    types::EncryptionAlgorithmSpec,
};
use base64::{Engine, engine::general_purpose::STANDARD as Base64Engine};
use serde::{Deserialize, Serialize};

use crate::error::CollectorError;

/// Key material for one account, as it appears in configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KeyCredential {
    /// Hex encoded secp256k1 private key, `0x` prefix optional
    PrivateKey { key: String },
    /// Signing happens inside AWS KMS; the key never leaves it
    AwsKms(AwsKmsCredential),
    /// Hex private key stored as base64 KMS ciphertext
    #[serde(rename_all = "camelCase")]
    KmsEncryptedPrivateKey {
        kms: AwsKmsCredential,
        encrypted_key: String,
    },
}

impl fmt::Debug for KeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCredential::PrivateKey { .. } => f
                .debug_struct("PrivateKey")
                .field("key", &"<redacted>")
                .finish(),
            KeyCredential::AwsKms(kms) => f.debug_tuple("AwsKms").field(kms).finish(),
            KeyCredential::KmsEncryptedPrivateKey { kms, .. } => f
                .debug_struct("KmsEncryptedPrivateKey")
                .field("kms", kms)
                .field("encrypted_key", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsKmsCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub key_id: String,
    pub region: String,
}

impl fmt::Debug for AwsKmsCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsKmsCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("key_id", &self.key_id)
            .field("region", &self.region)
            .finish()
    }
}

impl ProvideCredentials for AwsKmsCredential {
    fn provide_credentials<'a>(&'a self) -> ProvideCredentialsFuture<'a>
    where
        Self: 'a,
    {
        let credentials = Credentials::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            None,
            None,
            "erc20-collector",
        );
        ProvideCredentialsFuture::ready(Ok(credentials))
    }
}

impl AwsKmsCredential {
    pub async fn client(&self) -> aws_sdk_kms::Client {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(self.clone())
            .region(aws_config::Region::new(self.region.clone()))
            .load()
            .await;
        aws_sdk_kms::Client::new(&config)
    }

    pub async fn get_signer(&self, chain_id: Option<ChainId>) -> Result<AwsSigner, CollectorError> {
        let signer = AwsSigner::new(self.client().await, self.key_id.clone(), chain_id).await?;
        Ok(signer)
    }

    pub async fn decrypter(&self) -> KmsDecrypter {
        KmsDecrypter::new(self.client().await, self.key_id.clone())
    }
}

/// Encrypts and decrypts small secrets with an asymmetric KMS key (RSAES-OAEP-SHA-256).
///
/// Ciphertext travels as standard base64.
#[derive(Clone, Debug)]
pub struct KmsDecrypter {
    client: aws_sdk_kms::Client,
    key_id: String,
}

impl KmsDecrypter {
    pub fn new(client: aws_sdk_kms::Client, key_id: String) -> Self {
        Self { client, key_id }
    }

    pub async fn encrypt(&self, plaintext: &str) -> Result<String, CollectorError> {
        let output = self
            .client
            .encrypt()
            .key_id(&self.key_id)
            .plaintext(Blob::new(plaintext.as_bytes()))
            .encryption_algorithm(EncryptionAlgorithmSpec::RsaesOaepSha256)
            .send()
            .await
            .map_err(|e| CollectorError::kms_error("encrypt", e))?;

        let ciphertext = output
            .ciphertext_blob()
            .ok_or_else(|| CollectorError::InternalError {
                message: "KMS encrypt response carried no ciphertext".to_string(),
            })?;

        Ok(Base64Engine.encode(ciphertext.as_ref()))
    }

    pub async fn decrypt(&self, ciphertext: &str) -> Result<String, CollectorError> {
        let ciphertext = decode_ciphertext(ciphertext)?;

        let output = self
            .client
            .decrypt()
            .key_id(&self.key_id)
            .ciphertext_blob(Blob::new(ciphertext))
            .encryption_algorithm(EncryptionAlgorithmSpec::RsaesOaepSha256)
            .send()
            .await
            .map_err(|e| CollectorError::kms_error("decrypt", e))?;

        let plaintext = output
            .plaintext()
            .ok_or_else(|| CollectorError::InternalError {
                message: "KMS decrypt response carried no plaintext".to_string(),
            })?;

        String::from_utf8(plaintext.as_ref().to_vec()).map_err(|e| CollectorError::KeyError {
            message: format!("decrypted key is not valid UTF-8: {e}"),
        })
    }
}

fn decode_ciphertext(ciphertext: &str) -> Result<Vec<u8>, CollectorError> {
    Base64Engine
        .decode(ciphertext.trim())
        .map_err(|e| CollectorError::ValidationError {
            message: format!("ciphertext {ciphertext:?} is not valid base64: {e}"),
        })
}
