//! Tests for token minting

use super::*;
use crate::store::WebhookConfig;
use crate::{Alignment, ServiceName};
use tempfile::TempDir;

// ============================================================================
// Generation Tests
// ============================================================================

#[test]
fn test_mint_produces_32_alphanumeric_characters() {
    for _ in 0..100 {
        let token = mint();
        assert_eq!(token.as_str().len(), TOKEN_LENGTH);
        assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!token.is_legacy());
    }
}

#[test]
fn test_mint_values_vary() {
    let first = mint();
    let second = mint();
    assert_ne!(first, second);
}

// ============================================================================
// Uniqueness Tests
// ============================================================================

#[tokio::test]
async fn test_mint_unique_avoids_bound_tokens() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(
        dir.path().join("webhooks.conf"),
        dir.path().join("backups"),
    );

    let bound = mint();
    store
        .create(WebhookConfig {
            service: ServiceName::new("github").unwrap(),
            token: bound.clone(),
            alignment: Alignment::None,
            fields: "action".to_string(),
            template: "$action$".to_string(),
        })
        .await
        .unwrap();

    let minted = mint_unique(&store).await.unwrap();
    assert_ne!(minted, bound);
    assert!(!store.token_exists(&minted).await.unwrap());
}

#[tokio::test]
async fn test_mint_unique_on_empty_store() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(
        dir.path().join("webhooks.conf"),
        dir.path().join("backups"),
    );

    let minted = mint_unique(&store).await.unwrap();
    assert_eq!(minted.as_str().len(), TOKEN_LENGTH);
}
