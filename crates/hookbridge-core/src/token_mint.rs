//! # Token Mint
//!
//! Generates opaque webhook authentication tokens: 32 characters drawn from
//! `[A-Za-z0-9]` using the thread-local CSPRNG. Minted values carry no
//! embedded information.

use crate::store::{ConfigStore, StoreError};
use crate::{Token, TOKEN_LENGTH};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Collision retries before giving up
const MAX_MINT_ATTEMPTS: u32 = 8;

/// Error type for token minting
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("failed to mint a unique token after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Generate a fresh random token without a uniqueness check
pub fn mint() -> Token {
    let value: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect();
    Token::from_generated(value)
}

/// Generate a token that is unique against the current store
///
/// Retries on collision up to [`MAX_MINT_ATTEMPTS`] before failing with
/// [`MintError::Exhausted`].
pub async fn mint_unique(store: &ConfigStore) -> Result<Token, MintError> {
    for _ in 0..MAX_MINT_ATTEMPTS {
        let token = mint();
        if !store.token_exists(&token).await? {
            return Ok(token);
        }
    }

    Err(MintError::Exhausted {
        attempts: MAX_MINT_ATTEMPTS,
    })
}

#[cfg(test)]
#[path = "token_mint_tests.rs"]
mod tests;
