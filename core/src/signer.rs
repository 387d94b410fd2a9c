use std::fmt;

use alloy::{
    consensus::{SignableTransaction, Signed, TypedTransaction},
    network::TxSigner,
    primitives::{Address, ChainId, Signature},
    signers::{Signer, local::PrivateKeySigner},
};
use alloy_signer_aws::AwsSigner;

use crate::{credentials::KeyCredential, error::CollectorError};

/// A resolved account: an address plus the ability to sign for it.
#[derive(Clone)]
pub enum KeyProvider {
    Local(PrivateKeySigner),
    AwsKms(AwsSigner),
}

impl fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            KeyProvider::Local(_) => "Local",
            KeyProvider::AwsKms(_) => "AwsKms",
        };
        f.debug_struct("KeyProvider")
            .field("kind", &kind)
            .field("address", &self.address())
            .finish()
    }
}

impl KeyProvider {
    /// Resolves configured key material for `chain_id`. KMS backed variants talk to AWS here.
    pub async fn from_credential(
        credential: &KeyCredential,
        chain_id: ChainId,
    ) -> Result<Self, CollectorError> {
        match credential {
            KeyCredential::PrivateKey { key } => Self::from_private_key(key, chain_id),
            KeyCredential::AwsKms(kms) => {
                let signer = kms.get_signer(Some(chain_id)).await?;
                Ok(KeyProvider::AwsKms(signer))
            }
            KeyCredential::KmsEncryptedPrivateKey { kms, encrypted_key } => {
                let key = kms.decrypter().await.decrypt(encrypted_key).await?;
                Self::from_private_key(&key, chain_id)
            }
        }
    }

    pub fn from_private_key(key: &str, chain_id: ChainId) -> Result<Self, CollectorError> {
        let signer: PrivateKeySigner =
            key.trim().parse().map_err(|e| CollectorError::KeyError {
                message: format!("invalid private key: {e}"),
            })?;
        Ok(KeyProvider::Local(signer.with_chain_id(Some(chain_id))))
    }

    pub fn address(&self) -> Address {
        match self {
            KeyProvider::Local(signer) => Signer::address(signer),
            KeyProvider::AwsKms(signer) => Signer::address(signer),
        }
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            KeyProvider::Local(signer) => Signer::chain_id(signer),
            KeyProvider::AwsKms(signer) => Signer::chain_id(signer),
        }
    }

    pub async fn sign_transaction(
        &self,
        mut transaction: TypedTransaction,
    ) -> Result<Signed<TypedTransaction>, CollectorError> {
        let signature = match self {
            KeyProvider::Local(signer) => {
                TxSigner::<Signature>::sign_transaction(signer, &mut transaction).await
            }
            KeyProvider::AwsKms(signer) => {
                TxSigner::<Signature>::sign_transaction(signer, &mut transaction).await
            }
        }
        .map_err(|e| CollectorError::SigningError {
            message: format!("failed to sign transaction for {}: {e}", self.address()),
        })?;

        Ok(transaction.into_signed(signature))
    }
}
