use entsync_model::{EntitySchema, SubCollection};
use pretty_assertions::assert_eq;

#[test]
fn schema_declares_sub_collections() {
    let schema = EntitySchema::new("ORDERS", "orders")
        .with_sub_collection(SubCollection::new("ORDER_LINES", "order_lines", "orderKey"))
        .with_sub_collection(SubCollection::new("ORDER_NOTES", "order_notes", "orderKey"));
    assert_eq!(schema.channel, "ORDERS");
    assert_eq!(schema.table_key, "orders");
    assert_eq!(schema.sub_collections.len(), 2);
    assert_eq!(schema.sub_collections[0].parent_field, "orderKey");
}

#[test]
fn schema_deserializes_without_sub_collections() {
    let schema: EntitySchema =
        serde_json::from_str(r#"{"channel":"TAGS","table_key":"tags"}"#).unwrap();
    assert_eq!(schema, EntitySchema::new("TAGS", "tags"));
}
