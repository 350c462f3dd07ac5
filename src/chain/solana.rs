//! Solana chain client
//!
//! Talks to a Solana RPC node for USDC (SPL token) settlement. Instructions
//! are built manually with program-defined account lists and data layouts;
//! the transfer is signed by the platform signing authority.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{ChainClient, ChainError, ConfirmStatus, SigningAuthority};

/// SPL Token program
const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// Associated Token Account program
const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

/// SPL Token `Transfer` instruction tag
const TOKEN_IX_TRANSFER: u8 = 3;
/// ATA program `CreateIdempotent` instruction tag
const ATA_IX_CREATE_IDEMPOTENT: u8 = 1;

/// Poll interval while waiting for confirmation.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct SolanaRpcChainClient {
    rpc: RpcClient,
    mint: Pubkey,
    token_program: Pubkey,
    ata_program: Pubkey,
    authority: Arc<SigningAuthority>,
}

impl SolanaRpcChainClient {
    pub fn new(
        rpc_url: &str,
        mint: &str,
        authority: Arc<SigningAuthority>,
    ) -> Result<Self, ChainError> {
        let mint =
            Pubkey::from_str(mint).map_err(|_| ChainError::InvalidAddress(mint.to_string()))?;

        // Program ids are compile-time constants; parse failure is unreachable.
        let token_program = Pubkey::from_str(TOKEN_PROGRAM_ID)
            .map_err(|_| ChainError::InvalidAddress(TOKEN_PROGRAM_ID.to_string()))?;
        let ata_program = Pubkey::from_str(ASSOCIATED_TOKEN_PROGRAM_ID)
            .map_err(|_| ChainError::InvalidAddress(ASSOCIATED_TOKEN_PROGRAM_ID.to_string()))?;

        Ok(Self {
            rpc: RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
            mint,
            token_program,
            ata_program,
            authority,
        })
    }

    fn parse_address(&self, address: &str) -> Result<Pubkey, ChainError> {
        Pubkey::from_str(address).map_err(|_| ChainError::InvalidAddress(address.to_string()))
    }

    /// Derive the associated token account for `(mint, owner)`.
    fn derive_token_account(&self, owner: &Pubkey) -> Pubkey {
        let (ata, _bump) = Pubkey::find_program_address(
            &[
                owner.as_ref(),
                self.token_program.as_ref(),
                self.mint.as_ref(),
            ],
            &self.ata_program,
        );
        ata
    }

    async fn sign_and_send(&self, instruction: Instruction) -> Result<Signature, ChainError> {
        let payer = self.authority.pubkey();
        let mut transaction = Transaction::new_with_payer(&[instruction], Some(&payer));

        let recent_blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        transaction.sign(&[self.authority.keypair()], recent_blockhash);

        self.rpc
            .send_transaction(&transaction)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for SolanaRpcChainClient {
    fn validate_address(&self, address: &str) -> bool {
        Pubkey::from_str(address).is_ok()
    }

    fn authority_address(&self) -> String {
        self.authority.address()
    }

    async fn associated_token_account(&self, owner: &str) -> Result<Option<String>, ChainError> {
        let owner = self.parse_address(owner)?;
        let ata = self.derive_token_account(&owner);

        let response = self
            .rpc
            .get_account_with_commitment(&ata, CommitmentConfig::confirmed())
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(response.value.map(|_| ata.to_string()))
    }

    async fn create_associated_token_account(&self, owner: &str) -> Result<String, ChainError> {
        let owner = self.parse_address(owner)?;
        let ata = self.derive_token_account(&owner);
        let payer = self.authority.pubkey();

        let accounts = vec![
            AccountMeta::new(payer, true),
            AccountMeta::new(ata, false),
            AccountMeta::new_readonly(owner, false),
            AccountMeta::new_readonly(self.mint, false),
            AccountMeta::new_readonly(solana_program::system_program::ID, false),
            AccountMeta::new_readonly(self.token_program, false),
        ];

        let instruction = Instruction {
            program_id: self.ata_program,
            accounts,
            data: vec![ATA_IX_CREATE_IDEMPOTENT],
        };

        let signature = self.sign_and_send(instruction).await?;
        debug!(%signature, %ata, "Created associated token account");

        // Creation is platform setup, not settlement: block until it lands.
        match self.confirm(&signature.to_string(), Duration::from_secs(30)).await? {
            ConfirmStatus::Confirmed => Ok(ata.to_string()),
            other => Err(ChainError::Rpc(format!(
                "Token account creation did not confirm: {:?}",
                other
            ))),
        }
    }

    async fn submit_transfer(
        &self,
        source_token_account: &str,
        destination_token_account: &str,
        amount: u64,
    ) -> Result<String, ChainError> {
        let source = self.parse_address(source_token_account)?;
        let destination = self.parse_address(destination_token_account)?;

        let accounts = vec![
            AccountMeta::new(source, false),
            AccountMeta::new(destination, false),
            AccountMeta::new_readonly(self.authority.pubkey(), true),
        ];

        let mut data = Vec::with_capacity(9);
        data.push(TOKEN_IX_TRANSFER);
        data.extend_from_slice(&amount.to_le_bytes());

        let instruction = Instruction {
            program_id: self.token_program,
            accounts,
            data,
        };

        let signature = self.sign_and_send(instruction).await?;
        debug!(%signature, amount, "Submitted token transfer");
        Ok(signature.to_string())
    }

    async fn confirm(
        &self,
        signature: &str,
        timeout: Duration,
    ) -> Result<ConfirmStatus, ChainError> {
        let signature = Signature::from_str(signature)
            .map_err(|_| ChainError::InvalidAddress(signature.to_string()))?;

        let wait = async {
            loop {
                match self.rpc.get_signature_statuses(&[signature]).await {
                    Ok(response) => {
                        if let Some(Some(status)) = response.value.first() {
                            if status.err.is_some() {
                                return ConfirmStatus::Rejected;
                            }
                            if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                                return ConfirmStatus::Confirmed;
                            }
                        }
                    }
                    // Transient RPC failure: keep polling until the deadline.
                    Err(e) => debug!(error = %e, "Signature status poll failed"),
                }
                tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(status) => Ok(status),
            Err(_) => Ok(ConfirmStatus::TimedOut),
        }
    }
}
