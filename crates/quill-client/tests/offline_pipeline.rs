//! Offline round-trip of the whole client-side pipeline: passphrase → user
//! secret → journal envelope → chained entries → sharing. No server needed;
//! this is everything the protocol does before bytes hit the wire.

use quill_client::{verify_batch, Entry, Journal, Member, UserInfo, USER_INFO_CONTEXT};
use quill_crypto::{
    derive_user_secret, CryptoManager, KdfParams, CURRENT_VERSION,
};
use secrecy::SecretString;

fn fast_kdf() -> KdfParams {
    KdfParams {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

#[test]
fn full_pipeline_roundtrip() {
    let passphrase = SecretString::from("correct horse battery staple");
    let secret = derive_user_secret(&passphrase, "alice@example.com", &fast_kdf()).unwrap();

    // Journal envelope
    let uid = Journal::gen_uid();
    let crypto = CryptoManager::new(CURRENT_VERSION, &secret, &uid).unwrap();
    let metadata = br#"{"displayName":"Personal","type":"CALENDAR","color":-14310036}"#;
    let journal = Journal::new(&crypto, &uid, metadata).unwrap();
    assert_eq!(journal.content(&crypto).unwrap(), metadata);

    // Chained entries, verified as a server-ordered batch
    let payloads: [&[u8]; 3] = [
        br#"{"action":"ADD","content":"BEGIN:VEVENT..."}"#,
        br#"{"action":"CHANGE","content":"BEGIN:VEVENT..."}"#,
        br#"{"action":"DELETE","content":"BEGIN:VEVENT..."}"#,
    ];
    let mut entries: Vec<Entry> = Vec::new();
    for payload in payloads {
        entries.push(Entry::new(&crypto, payload, entries.last()).unwrap());
    }

    let verified = verify_batch(&crypto, None, entries.clone()).unwrap();
    assert_eq!(verified.len(), 3);
    for (v, p) in verified.iter().zip(payloads) {
        assert_eq!(v.plaintext, p);
    }

    // Resuming from the tail sees nothing new
    let tail_uid = entries.last().unwrap().uid.clone();
    assert!(verify_batch(&crypto, Some(&tail_uid), Vec::new())
        .unwrap()
        .is_empty());

    // Sharing: Bob publishes a key pair, Alice wraps key material to it
    let bob_secret = derive_user_secret(&passphrase, "bob@example.com", &fast_kdf()).unwrap();
    let bob_crypto = CryptoManager::new(CURRENT_VERSION, &bob_secret, USER_INFO_CONTEXT).unwrap();
    let bob_info = UserInfo::generate(&bob_crypto, "bob@example.com").unwrap();
    bob_info.verify(&bob_crypto).unwrap();

    let bob_pubkey: [u8; 32] = bob_info.pubkey.clone().try_into().unwrap();
    let key_material = [5u8; 32];
    let member = Member::wrap("bob@example.com", &uid, &bob_pubkey, &key_material).unwrap();

    // Bob recovers his key pair from the blob and unwraps
    let bob_keypair = bob_info.keypair(&bob_crypto).unwrap();
    let unwrapped = quill_crypto::open(&bob_keypair, &member.key, uid.as_bytes()).unwrap();
    assert_eq!(unwrapped, key_material);
}

#[test]
fn journal_keys_are_isolated_per_uid() {
    let passphrase = SecretString::from("correct horse battery staple");
    let secret = derive_user_secret(&passphrase, "alice@example.com", &fast_kdf()).unwrap();

    let uid_a = Journal::gen_uid();
    let uid_b = Journal::gen_uid();
    let crypto_a = CryptoManager::new(CURRENT_VERSION, &secret, &uid_a).unwrap();
    let crypto_b = CryptoManager::new(CURRENT_VERSION, &secret, &uid_b).unwrap();

    let journal = Journal::new(&crypto_a, &uid_a, b"metadata").unwrap();

    // The other journal's keys can neither verify nor decrypt it
    assert!(journal.verify(&crypto_b).is_err());
    assert!(crypto_b.decrypt(&journal.content).is_err());

    // And identical entry payloads produce unrelated chain uids
    let entry_a = Entry::new(&crypto_a, b"payload", None).unwrap();
    let entry_b = Entry::new(&crypto_b, b"payload", None).unwrap();
    assert_ne!(entry_a.uid, entry_b.uid);
}
