/// Redis key-construction helpers for one record type.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
    pub collection: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str, collection: &'a str) -> Self {
        Self {
            prefix,
            service,
            collection,
        }
    }

    pub fn record(&self, id: u64) -> String {
        format!("{}:{}:{}:{}", self.prefix, self.service, self.collection, id)
    }

    /// Counter the store increments to hand out record ids.
    pub fn sequence(&self) -> String {
        format!("{}:{}:{}:seq", self.prefix, self.service, self.collection)
    }

    /// Sorted set of ids whose token is still null, scored by id.
    pub fn untokenized(&self) -> String {
        format!("{}:{}:{}:untokenized", self.prefix, self.service, self.collection)
    }

    /// Unique index hash mapping each value of `field` to its owning id.
    pub fn unique(&self, field: &str) -> String {
        format!("{}:{}:{}:unique:{}", self.prefix, self.service, self.collection, field)
    }

    pub fn collection_pattern(&self) -> String {
        format!("{}:{}:{}:*", self.prefix, self.service, self.collection)
    }
}
