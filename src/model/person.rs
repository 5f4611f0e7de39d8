use std::collections::BTreeSet;

use super::fields::{Address, Email, Listing, Name, Phone, PropertyName, Tag};

/// A fully validated contact. Raw data that fails validation never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub name: Name,
    pub phone: Phone,
    pub email: Email,
    pub address: Address,
    pub listing: Option<Listing>,
    pub tags: BTreeSet<Tag>,
    pub owned_properties: BTreeSet<PropertyName>,
    pub interested_properties: BTreeSet<PropertyName>,
}

impl Person {
    pub fn new(name: Name, phone: Phone, email: Email, address: Address) -> Self {
        Self {
            name,
            phone,
            email,
            address,
            listing: None,
            tags: BTreeSet::new(),
            owned_properties: BTreeSet::new(),
            interested_properties: BTreeSet::new(),
        }
    }

    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listing = Some(listing);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn with_owned(mut self, properties: impl IntoIterator<Item = PropertyName>) -> Self {
        self.owned_properties.extend(properties);
        self
    }

    pub fn with_interested(mut self, properties: impl IntoIterator<Item = PropertyName>) -> Self {
        self.interested_properties.extend(properties);
        self
    }

    /// Identity is the name alone; phone and email may repeat across people.
    pub fn is_same_person(&self, other: &Person) -> bool {
        self.name == other.name
    }

    pub fn owns(&self, property: &PropertyName) -> bool {
        self.owned_properties.contains(property)
    }

    pub fn is_interested_in(&self, property: &PropertyName) -> bool {
        self.interested_properties.contains(property)
    }
}
