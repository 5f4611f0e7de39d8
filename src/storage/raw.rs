//! Untyped records as read from the backing file, and the adapter between them
//! and the validated model.
//!
//! Decoding is lenient on purpose: a raw record must be able to hold whatever
//! the file contains so that invalid entries can be quarantined and repaired
//! instead of failing the whole load.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::model::{
    Address, Email, FieldError, FieldKey, Listing, Name, Person, Phone, Price, Property,
    PropertyName, Tag, PERSON_FIELD_ORDER, PROPERTY_FIELD_ORDER,
};

mod lenient {
    use super::*;

    pub(super) fn text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Strings pass through, numbers and booleans are stringified, anything else is missing.
    pub(super) fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(text(&Value::deserialize(deserializer)?))
    }

    /// Arrays keep one entry per element; a lone scalar becomes a single entry.
    /// Non-scalar elements keep their JSON text so validation rejects them.
    pub(super) fn list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .iter()
                .map(|item| text(item).unwrap_or_else(|| item.to_string()))
                .collect(),
            other => vec![text(&other).unwrap_or_else(|| other.to_string())],
        })
    }
}

fn required<T>(
    raw: &Option<String>,
    key: FieldKey,
    parse: fn(&str) -> Result<T, FieldError>,
) -> Result<T, FieldError> {
    match raw {
        Some(value) => parse(value),
        None => Err(FieldError::missing(key)),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// A person element exactly as decoded from the `persons` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RawPerson {
    #[serde(
        default,
        deserialize_with = "lenient::scalar",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::scalar",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::scalar",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::scalar",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub address: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::scalar",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub listing: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub owned_properties: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub interested_properties: Vec<String>,
    /// Keys this version does not know about; written back untouched.
    #[serde(flatten)]
    #[ts(skip)]
    pub extras: BTreeMap<String, Value>,
}

impl RawPerson {
    /// Decodes one array element. Fails only when the element is not an object.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        RawPerson::deserialize(value)
    }

    /// Strict conversion: stops at the first invalid field, checked in
    /// [`PERSON_FIELD_ORDER`].
    pub fn to_model(&self) -> Result<Person, FieldError> {
        let name = required(&self.name, FieldKey::Name, Name::parse)?;
        let phone = required(&self.phone, FieldKey::Phone, Phone::parse)?;
        let email = required(&self.email, FieldKey::Email, Email::parse)?;
        let address = required(&self.address, FieldKey::Address, Address::parse)?;
        let listing = self.listing_text().map(Listing::parse).transpose()?;
        let tags = self
            .tags
            .iter()
            .map(|tag| Tag::parse(tag))
            .collect::<Result<Vec<_>, _>>()?;
        let owned = parse_references(&self.owned_properties, FieldKey::OwnedProperties)?;
        let interested =
            parse_references(&self.interested_properties, FieldKey::InterestedProperties)?;

        let mut person = Person::new(name, phone, email, address)
            .with_tags(tags)
            .with_owned(owned)
            .with_interested(interested);
        person.listing = listing;
        Ok(person)
    }

    /// Every field that fails validation, checked independently. Never fails.
    pub fn diagnose_invalid_fields(&self) -> BTreeSet<FieldKey> {
        PERSON_FIELD_ORDER
            .iter()
            .copied()
            .filter(|key| !self.field_is_valid(*key))
            .collect()
    }

    fn field_is_valid(&self, key: FieldKey) -> bool {
        match key {
            FieldKey::Name => self.name.as_deref().is_some_and(Name::is_valid),
            FieldKey::Phone => self.phone.as_deref().is_some_and(Phone::is_valid),
            FieldKey::Email => self.email.as_deref().is_some_and(Email::is_valid),
            FieldKey::Address => self.address.as_deref().is_some_and(Address::is_valid),
            FieldKey::Listing => self.listing_text().map_or(true, Listing::is_valid),
            FieldKey::Tags => self.tags.iter().all(|tag| Tag::is_valid(tag)),
            FieldKey::OwnedProperties => self
                .owned_properties
                .iter()
                .all(|p| PropertyName::is_valid(p)),
            FieldKey::InterestedProperties => self
                .interested_properties
                .iter()
                .all(|p| PropertyName::is_valid(p)),
            FieldKey::Price | FieldKey::PropertyName => true,
        }
    }

    /// A blank listing means no listing.
    fn listing_text(&self) -> Option<&str> {
        self.listing.as_deref().filter(|value| !value.trim().is_empty())
    }

    /// The JSON written for `key`, or `None` when the key should be absent.
    pub(crate) fn field_value(&self, key: FieldKey) -> Option<Value> {
        fn text(value: &Option<String>) -> Option<Value> {
            value.clone().map(Value::String)
        }
        fn list(values: &[String]) -> Option<Value> {
            Some(Value::Array(values.iter().cloned().map(Value::String).collect()))
        }

        match key {
            FieldKey::Name => text(&self.name),
            FieldKey::Phone => text(&self.phone),
            FieldKey::Email => text(&self.email),
            FieldKey::Address => text(&self.address),
            FieldKey::Listing => self.listing_text().map(|l| Value::String(l.to_string())),
            FieldKey::Tags => list(&self.tags),
            FieldKey::OwnedProperties => list(&self.owned_properties),
            FieldKey::InterestedProperties => list(&self.interested_properties),
            FieldKey::Price | FieldKey::PropertyName => None,
        }
    }

    /// Compact JSON for log lines; `{}` if serialization fails.
    pub fn to_raw_diagnostic(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Field value as text, list fields joined with `", "`.
    pub fn field_text(&self, key: FieldKey) -> Option<String> {
        match key {
            FieldKey::Name => self.name.clone(),
            FieldKey::Phone => self.phone.clone(),
            FieldKey::Email => self.email.clone(),
            FieldKey::Address => self.address.clone(),
            FieldKey::Listing => self.listing.clone(),
            FieldKey::Tags => Some(self.tags.join(", ")),
            FieldKey::OwnedProperties => Some(self.owned_properties.join(", ")),
            FieldKey::InterestedProperties => Some(self.interested_properties.join(", ")),
            FieldKey::Price | FieldKey::PropertyName => None,
        }
    }

    fn set_field(&mut self, key: FieldKey, value: &str) {
        match key {
            FieldKey::Name => self.name = Some(value.to_string()),
            FieldKey::Phone => self.phone = Some(value.to_string()),
            FieldKey::Email => self.email = Some(value.to_string()),
            FieldKey::Address => self.address = Some(value.to_string()),
            FieldKey::Listing => {
                self.listing = (!value.trim().is_empty()).then(|| value.to_string())
            }
            FieldKey::Tags => self.tags = split_list(value),
            FieldKey::OwnedProperties => self.owned_properties = split_list(value),
            FieldKey::InterestedProperties => self.interested_properties = split_list(value),
            FieldKey::Price | FieldKey::PropertyName => {}
        }
    }

    /// Applies `corrections` to the fields in `flagged` only. Every other field,
    /// including unknown keys, is carried over as read.
    pub fn merge_corrections(
        &self,
        flagged: &BTreeSet<FieldKey>,
        corrections: &BTreeMap<FieldKey, String>,
    ) -> RawPerson {
        let mut merged = self.clone();
        for (key, value) in corrections {
            if flagged.contains(key) {
                merged.set_field(*key, value);
            } else {
                tracing::debug!(
                    target: "propbook",
                    event = "repair_correction_ignored",
                    field = key.as_str()
                );
            }
        }
        merged
    }
}

fn parse_references(raw: &[String], key: FieldKey) -> Result<Vec<PropertyName>, FieldError> {
    raw.iter()
        .map(|name| PropertyName::parse(name).map_err(|err| err.for_key(key)))
        .collect()
}

impl From<&Person> for RawPerson {
    fn from(person: &Person) -> Self {
        RawPerson {
            name: Some(person.name.to_string()),
            phone: Some(person.phone.to_string()),
            email: Some(person.email.to_string()),
            address: Some(person.address.to_string()),
            listing: person.listing.as_ref().map(ToString::to_string),
            tags: person.tags.iter().map(ToString::to_string).collect(),
            owned_properties: person
                .owned_properties
                .iter()
                .map(ToString::to_string)
                .collect(),
            interested_properties: person
                .interested_properties
                .iter()
                .map(ToString::to_string)
                .collect(),
            extras: BTreeMap::new(),
        }
    }
}

/// A property element exactly as decoded from the `properties` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProperty {
    #[serde(
        default,
        deserialize_with = "lenient::scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub property_name: Option<String>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl RawProperty {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        RawProperty::deserialize(value)
    }

    pub fn to_model(&self) -> Result<Property, FieldError> {
        let address = required(&self.address, FieldKey::Address, Address::parse)?;
        let price = required(&self.price, FieldKey::Price, Price::parse)?;
        let property_name =
            required(&self.property_name, FieldKey::PropertyName, PropertyName::parse)?;
        Ok(Property::new(address, price, property_name))
    }

    pub fn diagnose_invalid_fields(&self) -> BTreeSet<FieldKey> {
        PROPERTY_FIELD_ORDER
            .iter()
            .copied()
            .filter(|key| match key {
                FieldKey::Address => !self.address.as_deref().is_some_and(Address::is_valid),
                FieldKey::Price => !self.price.as_deref().is_some_and(Price::is_valid),
                _ => !self
                    .property_name
                    .as_deref()
                    .is_some_and(PropertyName::is_valid),
            })
            .collect()
    }
}

impl From<&Property> for RawProperty {
    fn from(property: &Property) -> Self {
        RawProperty {
            address: Some(property.address.to_string()),
            price: Some(property.price.to_string()),
            property_name: Some(property.property_name.to_string()),
            extras: BTreeMap::new(),
        }
    }
}

/// The document shape written by a normal save.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SerializableAddressBook {
    pub persons: Vec<RawPerson>,
    pub properties: Vec<RawProperty>,
}

impl From<&crate::model::AddressBook> for SerializableAddressBook {
    fn from(book: &crate::model::AddressBook) -> Self {
        Self {
            persons: book.persons().iter().map(RawPerson::from).collect(),
            properties: book.properties().iter().map(RawProperty::from).collect(),
        }
    }
}
