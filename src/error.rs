/// Error codes a wallet provider may attach to a rejected request.
///
/// Wallets follow the EIP-1193 numbering for the common cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum ProviderErrorCode {
    #[error("The user rejected the request.")]
    UserRejectedRequest,
    /// The application has not been authorized by the user yet.
    #[error("The requested method or account has not been authorized.")]
    Unauthorized,
    #[error("The wallet does not support the requested method.")]
    UnsupportedMethod,
    #[error("The wallet is disconnected.")]
    Disconnected,
    #[error("Invalid parameters.")]
    InvalidParams,
    #[error("An error occured inside the wallet.")]
    InternalError,
    #[error("Unknown error code `{0}'")]
    Unknown(i64),
}

/// The error returned by the wallet provider itself.
///
/// It is kept as is (wrapped in [`WalletError::ProviderRejected`]) so the
/// application can see what the wallet really reported.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error, serde::Deserialize,
)]
#[error("{code}. {message}.")]
pub struct ProviderError {
    #[serde(default = "ProviderError::default_code")]
    pub code: ProviderErrorCode,
    #[serde(default)]
    pub message: String,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn default_code() -> ProviderErrorCode {
        ProviderErrorCode::InternalError
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet not connected")]
    NotConnected,
    #[error("Wallet feature `{feature}' is not supported")]
    FeatureNotSupported { feature: String },
    /// The provider does not satisfy the wallet-standard requirements.
    #[error("Wallet `{name}' is not a compliant Solana wallet: {reason}")]
    InvalidProvider { name: String, reason: String },
    #[error("Invalid response from the wallet: {0}")]
    InvalidProviderResponse(String),
    #[error("Couldn't serialize the transaction: {0}")]
    SerializationFailure(String),
    #[error("Couldn't submit the transaction: {0}")]
    NetworkSubmissionFailure(String),
    #[error(transparent)]
    ProviderRejected(#[from] ProviderError),
}

impl WalletError {
    pub(crate) fn unsupported(feature: impl Into<String>) -> Self {
        Self::FeatureNotSupported {
            feature: feature.into(),
        }
    }
}

impl<'de> serde::Deserialize<'de> for ProviderErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;
        impl serde::de::Visitor<'_> for Visitor {
            type Value = ProviderErrorCode;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "Expecting an integer ProviderErrorCode")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match v {
                    4001 => Ok(ProviderErrorCode::UserRejectedRequest),
                    4100 => Ok(ProviderErrorCode::Unauthorized),
                    4200 => Ok(ProviderErrorCode::UnsupportedMethod),
                    4900 => Ok(ProviderErrorCode::Disconnected),
                    -32602 => Ok(ProviderErrorCode::InvalidParams),
                    -32603 => Ok(ProviderErrorCode::InternalError),
                    unknown => Ok(ProviderErrorCode::Unknown(unknown)),
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let v = i64::try_from(v).map_err(E::custom)?;
                self.visit_i64(v)
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                // javascript numbers arrive as f64
                if v.fract() != 0.0 {
                    return Err(E::custom(format!("non integer error code {v}")));
                }
                self.visit_i64(v as i64)
            }
        }

        deserializer.deserialize_i64(Visitor)
    }
}
