use serde::{Deserialize, Serialize};

/// Errors raised while validating an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentError {
    /// A required field was empty.
    MissingField(&'static str),
}

/// Token standard of an NFT collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NftType {
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC1155")]
    Erc1155,
}

impl NftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NftType::Erc721 => "ERC721",
            NftType::Erc1155 => "ERC1155",
        }
    }
}

/// A user-initiated transfer request.
///
/// Numeric fields (`amount`, `nft_id`, `value`) are decimal or `0x`-hex strings exactly as the
/// host application received them; the engine parses them at encode time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Intent {
    TokenTransfer {
        recipient: String,
        token_address: String,
        amount: String,
        network_id: String,
    },
    NftTransfer {
        recipient: String,
        collection_address: String,
        nft_id: String,
        amount: String,
        nft_type: NftType,
        network_id: String,
    },
    RawTransaction {
        from: String,
        to: String,
        data: String,
        value: String,
        chain_id: u64,
    },
}

impl Intent {
    /// Tag placed in the job call so the executor can dispatch on the intent kind.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Intent::TokenTransfer { .. } => "token_transfer",
            Intent::NftTransfer { .. } => "nft_transfer",
            Intent::RawTransaction { .. } => "raw_transaction",
        }
    }

    /// Reject intents with empty required fields.
    ///
    /// `data` of a raw transaction may be empty (plain value transfer) but must still be present
    /// as `0x`.
    pub fn validate(&self) -> Result<(), IntentError> {
        match self {
            Intent::TokenTransfer {
                recipient,
                token_address,
                amount,
                network_id,
            } => {
                require("recipient", recipient)?;
                require("tokenAddress", token_address)?;
                require("amount", amount)?;
                require("networkId", network_id)
            }
            Intent::NftTransfer {
                recipient,
                collection_address,
                nft_id,
                amount,
                network_id,
                ..
            } => {
                require("recipient", recipient)?;
                require("collectionAddress", collection_address)?;
                require("nftId", nft_id)?;
                require("amount", amount)?;
                require("networkId", network_id)
            }
            Intent::RawTransaction {
                from,
                to,
                data,
                value,
                chain_id,
            } => {
                require("from", from)?;
                require("to", to)?;
                require("data", data)?;
                require("value", value)?;
                if *chain_id == 0 {
                    return Err(IntentError::MissingField("chainId"));
                }
                Ok(())
            }
        }
    }
}

fn require(name: &'static str, value: &str) -> Result<(), IntentError> {
    if value.trim().is_empty() {
        return Err(IntentError::MissingField(name));
    }
    Ok(())
}
