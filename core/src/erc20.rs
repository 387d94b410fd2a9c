use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};

use crate::error::{CollectorError, ContractInteractionErrorKind};

sol! {
    #[allow(missing_docs)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// `keccak256("transfer(address,uint256)")[..4]`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

const TRANSFER_CALLDATA_LEN: usize = 4 + 32 + 32;

/// Calldata for `transfer(to, amount)`.
pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

/// Recovers `(recipient, amount)` from `transfer` calldata.
///
/// Checks the exact layout: selector, left-padded address word, big-endian amount word.
pub fn decode_transfer_calldata(data: &[u8]) -> Result<(Address, U256), CollectorError> {
    let invalid = |message: String| CollectorError::ContractInteractionError {
        contract_address: None,
        chain_id: 0,
        message: message.clone(),
        kind: ContractInteractionErrorKind::CalldataDecodingFailed { message },
    };

    if data.len() != TRANSFER_CALLDATA_LEN {
        return Err(invalid(format!(
            "expected {TRANSFER_CALLDATA_LEN} bytes of transfer calldata, got {}",
            data.len()
        )));
    }

    if data[..4] != TRANSFER_SELECTOR {
        return Err(invalid(format!(
            "unexpected selector 0x{}",
            alloy::hex::encode(&data[..4])
        )));
    }

    let address_word = &data[4..36];
    if address_word[..12].iter().any(|byte| *byte != 0) {
        return Err(invalid("recipient word has non-zero padding".to_string()));
    }

    let to = Address::from_slice(&address_word[12..]);
    let amount = U256::from_be_slice(&data[36..68]);
    Ok((to, amount))
}
