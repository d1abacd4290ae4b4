//! End-to-end tests for identity metadata: publication, fail-closed
//! parsing, and claim verification against out-of-band evidence.

use claimkit_lib::metadata::verify::{
    create_keybase_proof, domain_txt_entry, keybase_proof_url, ClaimVerifier,
};
use claimkit_lib::metadata::{
    create_account_claim, create_domain_claim, create_keybase_claim, create_name_claim,
    create_storage_claim,
};
use claimkit_lib::prelude::*;
use claimkit_lib::test_utils::{MockDnsResolver, TestEnvironment};

// ============================================================================
// Publication and parsing
// ============================================================================

#[tokio::test]
async fn published_metadata_round_trips_through_fetch() {
    let env = TestEnvironment::new(1).await;
    let account = env.account(0);

    let mut metadata = IdentityMetadata::from_empty(account.address);
    metadata
        .add_claim(
            create_storage_claim(&account.root, ".*"),
            env.keystore.as_ref(),
            &account.address,
        )
        .await
        .unwrap();
    metadata
        .add_claim(
            create_name_claim("integration"),
            env.keystore.as_ref(),
            &account.address,
        )
        .await
        .unwrap();
    env.host.publish(&account.metadata_url, metadata.to_bytes());

    let fetcher = env.host.fetcher();
    let fetched =
        IdentityMetadata::fetch_from_url(env.registry.as_ref(), &fetcher, &account.metadata_url)
            .await
            .unwrap();
    assert_eq!(fetched, metadata);
    assert!(fetched.find_claim(ClaimType::Name).is_some());
}

#[tokio::test]
async fn tampered_published_metadata_is_rejected() {
    let env = TestEnvironment::new(1).await;
    let account = env.account(0);
    let fetcher = env.host.fetcher();

    // The fixture publishes a validly signed document; tamper with it.
    let mut fetched =
        IdentityMetadata::fetch_from_url(env.registry.as_ref(), &fetcher, &account.metadata_url)
            .await
            .unwrap();
    fetched.claims.push(create_name_claim("injected"));
    env.host.publish(&account.metadata_url, fetched.to_bytes());

    let result =
        IdentityMetadata::fetch_from_url(env.registry.as_ref(), &fetcher, &account.metadata_url)
            .await;
    assert!(result.is_err());
}

// ============================================================================
// Claim verification
// ============================================================================

#[tokio::test]
async fn domain_and_keybase_claims_verify_against_evidence() {
    let env = TestEnvironment::new(1).await;
    let account = env.account(0);
    let dns = MockDnsResolver::new();

    // Extend the published document with a domain claim, then republish the
    // document's signature as the TXT proof.
    let fetcher = env.host.fetcher();
    let mut metadata =
        IdentityMetadata::fetch_from_url(env.registry.as_ref(), &fetcher, &account.metadata_url)
            .await
            .unwrap();
    let domain_claim = metadata
        .add_claim(
            create_domain_claim("example.com"),
            env.keystore.as_ref(),
            &account.address,
        )
        .await
        .unwrap();
    env.host.publish(&account.metadata_url, metadata.to_bytes());
    dns.publish_txt("example.com", domain_txt_entry(&metadata).unwrap());

    let keybase_claim = create_keybase_claim("alice");
    let proof = create_keybase_proof(
        keybase_claim.clone(),
        env.keystore.as_ref(),
        &account.address,
    )
    .await
    .unwrap();
    env.host.publish(
        &keybase_proof_url("alice", &account.address),
        serde_json::to_vec(&proof).unwrap(),
    );

    let verifier = ClaimVerifier::new(env.registry.as_ref(), &fetcher, &dns);
    verifier
        .verify_claim(&domain_claim, &account.address)
        .await
        .unwrap();
    verifier
        .verify_claim(&keybase_claim, &account.address)
        .await
        .unwrap();
}

#[tokio::test]
async fn account_claims_verify_only_when_reciprocal() {
    let env = TestEnvironment::new(2).await;
    let alice = env.account(0).address;
    let bob = env.account(1).address;
    let dns = MockDnsResolver::new();
    let fetcher = env.host.fetcher();
    let verifier = ClaimVerifier::new(env.registry.as_ref(), &fetcher, &dns);

    let alice_claims_bob = create_account_claim(&alice, bob, None).unwrap();
    assert!(verifier.verify_claim(&alice_claims_bob, &alice).await.is_err());

    // Bob adds the reciprocal claim to his published document.
    let bob_fixture = env.account(1);
    let mut bob_metadata = IdentityMetadata::fetch_from_url(
        env.registry.as_ref(),
        &fetcher,
        &bob_fixture.metadata_url,
    )
    .await
    .unwrap();
    bob_metadata
        .add_claim(
            create_account_claim(&bob, alice, None).unwrap(),
            env.keystore.as_ref(),
            &bob,
        )
        .await
        .unwrap();
    env.host
        .publish(&bob_fixture.metadata_url, bob_metadata.to_bytes());

    verifier
        .verify_claim(&alice_claims_bob, &alice)
        .await
        .unwrap();
}
