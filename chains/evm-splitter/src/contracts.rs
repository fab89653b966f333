//! Bindings for the on-chain batching contract.

use ethers::prelude::abigen;

abigen!(
    BatchTransfer,
    r#"[
        function batchSend(address[] recipients, uint256[] amounts) external payable
    ]"#
);
