mod support;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serial_test::serial;
use support::Product;
use tokenom::{
    DEFAULT_TOKEN_BYTE_LENGTH, MemoryStore, Registration, Repo, TokenConfig, TokenDescriptor, Tokenizable,
    get_descriptor, register_descriptor,
};

#[derive(Tokenizable, Serialize, Deserialize, Debug, Clone, Default)]
#[tokenizable(service = "billing", collection = "invoices")]
struct Invoice {
    #[tokenizable(id)]
    #[serde(default)]
    id: Option<u64>,
    #[tokenizable(token)]
    #[serde(default)]
    public_code: Option<String>,
    #[tokenizable(created_at)]
    #[serde(default = "Utc::now")]
    issued_at: DateTime<Utc>,
    amount: i64,
}

#[test]
fn derive_reports_configuration() {
    let descriptor = Product::descriptor();
    assert_eq!(descriptor.service, "shop");
    assert_eq!(descriptor.collection, "products");
    assert_eq!(descriptor.token_field, "token");
    assert_eq!(descriptor.token_config.byte_length().get(), 12);
    assert_eq!(Product::SERVICE, "shop");
    assert_eq!(Product::COLLECTION, "products");
}

#[test]
fn token_length_defaults_to_eight_bytes() {
    let descriptor = Invoice::descriptor();
    assert_eq!(descriptor.token_config, TokenConfig::default());
    assert_eq!(descriptor.token_config.byte_length().get(), DEFAULT_TOKEN_BYTE_LENGTH);
    assert_eq!(descriptor.token_field, "public_code");
}

#[test]
fn accessors_map_onto_annotated_fields() {
    let mut invoice = Invoice::default();
    assert_eq!(invoice.record_id(), None);
    assert_eq!(invoice.token(), None);

    invoice.set_record_id(7);
    invoice.set_token("inv-code".to_string());
    let at = Utc::now();
    invoice.touch_created(at);
    invoice.touch_updated(Utc::now());

    assert_eq!(invoice.id, Some(7));
    assert_eq!(invoice.public_code.as_deref(), Some("inv-code"));
    assert_eq!(invoice.issued_at, at);
}

#[tokio::test]
async fn renamed_token_field_round_trips() {
    let mut repo = Repo::<Invoice>::new("tokenom");
    let mut store = MemoryStore::for_descriptor(repo.descriptor());

    let invoice = repo
        .create(
            &mut store,
            Invoice {
                amount: 250,
                ..Invoice::default()
            },
        )
        .await
        .unwrap();

    let code = invoice.public_code.clone().unwrap();
    assert_eq!(code.len(), 11);
    let loaded = repo.get(&mut store, 1).await.unwrap().unwrap();
    assert_eq!(loaded.public_code, Some(code));
    assert_eq!(loaded.amount, 250);
}

#[test]
#[serial]
fn descriptor_registers_the_type() {
    Product::descriptor();
    let registered = get_descriptor("shop", "products").expect("registered on first use");
    assert_eq!(registered, Product::descriptor());
}

#[test]
#[serial]
fn redefinition_replaces_earlier_settings() {
    let descriptor = |len| TokenDescriptor {
        service: "derive_test".to_string(),
        collection: "coupons".to_string(),
        token_field: "token".to_string(),
        token_config: TokenConfig::new(len).unwrap(),
    };

    assert_eq!(register_descriptor(&descriptor(6)), Registration::New);
    assert_eq!(
        register_descriptor(&descriptor(10)),
        Registration::Redefined { previous: 6, current: 10 }
    );
    let stored = get_descriptor("derive_test", "coupons").unwrap();
    assert_eq!(stored.token_config.byte_length().get(), 10);
}
