use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use unicode_normalization::UnicodeNormalization;

/// Keys of the on-disk record fields. The serialized form is the JSON key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum FieldKey {
    Name,
    Phone,
    Email,
    Address,
    Listing,
    Tags,
    OwnedProperties,
    InterestedProperties,
    Price,
    PropertyName,
}

/// Person fields in the order strict conversion checks them.
pub const PERSON_FIELD_ORDER: [FieldKey; 8] = [
    FieldKey::Name,
    FieldKey::Phone,
    FieldKey::Email,
    FieldKey::Address,
    FieldKey::Listing,
    FieldKey::Tags,
    FieldKey::OwnedProperties,
    FieldKey::InterestedProperties,
];

/// Property fields in the order strict conversion checks them.
pub const PROPERTY_FIELD_ORDER: [FieldKey; 3] =
    [FieldKey::Address, FieldKey::Price, FieldKey::PropertyName];

impl FieldKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Name => "name",
            FieldKey::Phone => "phone",
            FieldKey::Email => "email",
            FieldKey::Address => "address",
            FieldKey::Listing => "listing",
            FieldKey::Tags => "tags",
            FieldKey::OwnedProperties => "ownedProperties",
            FieldKey::InterestedProperties => "interestedProperties",
            FieldKey::Price => "price",
            FieldKey::PropertyName => "propertyName",
        }
    }

    /// Fields holding a list of values rather than a single string.
    #[must_use]
    pub fn is_list(self) -> bool {
        matches!(
            self,
            FieldKey::Tags | FieldKey::OwnedProperties | FieldKey::InterestedProperties
        )
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PERSON_FIELD_ORDER
            .iter()
            .chain(PROPERTY_FIELD_ORDER.iter())
            .copied()
            .find(|key| key.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown field: {value}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{key}: {message}")]
pub struct FieldError {
    pub key: FieldKey,
    pub message: String,
}

impl FieldError {
    pub fn new(key: FieldKey, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }

    pub fn missing(key: FieldKey) -> Self {
        Self::new(key, format!("Missing required field: {key}"))
    }

    /// Re-attributes the error to another field, e.g. a property name used as a reference.
    pub fn for_key(self, key: FieldKey) -> Self {
        Self { key, ..self }
    }
}

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} ]*$").expect("valid name regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3,}$").expect("valid phone regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[A-Za-z0-9]+(?:[+_.-][A-Za-z0-9]+)*",
        r"@(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)*",
        r"[A-Za-z0-9][A-Za-z0-9-]*[A-Za-z0-9]$"
    ))
    .expect("valid email regex")
});
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S").expect("valid address regex"));
static LISTING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:buyer|seller|landlord|tenant)$").expect("valid listing regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid tag regex"));
static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,12}(?:\.[0-9]{1,2})?$").expect("valid price regex"));
static PROPERTY_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} '#-]*$").expect("valid property name regex")
});

fn verbatim(raw: &str) -> String {
    raw.to_string()
}

fn nfc(raw: &str) -> String {
    raw.nfc().collect()
}

fn lowercase(raw: &str) -> String {
    raw.to_ascii_lowercase()
}

macro_rules! validated_field {
    (
        $(#[$meta:meta])*
        $ty:ident, $key:ident, $constraint:literal,
        normalize = $normalize:path,
        check = $check:expr $(,)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $ty(String);

        impl $ty {
            pub const CONSTRAINT: &'static str = $constraint;

            /// Checks `raw` without constructing the value.
            #[must_use]
            pub fn is_valid(raw: &str) -> bool {
                let check: fn(&str) -> bool = $check;
                check(&$normalize(raw))
            }

            pub fn parse(raw: &str) -> Result<Self, FieldError> {
                let value = $normalize(raw);
                let check: fn(&str) -> bool = $check;
                if check(&value) {
                    Ok(Self(value))
                } else {
                    Err(FieldError::new(FieldKey::$key, Self::CONSTRAINT))
                }
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = FieldError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Self::parse(raw)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

validated_field!(
    /// A person's name; identity of a person record.
    Name, Name,
    "Names should only contain letters, digits and spaces, and must not be blank",
    normalize = nfc,
    check = |value| NAME_RE.is_match(value),
);

validated_field!(
    Phone, Phone,
    "Phone numbers should only contain digits, and be at least 3 digits long",
    normalize = verbatim,
    check = |value| PHONE_RE.is_match(value),
);

validated_field!(
    Email, Email,
    "Emails should be of the format local-part@domain, where the local part holds \
     alphanumerics separated by single + _ . - characters and the domain ends with a \
     label of at least 2 characters",
    normalize = verbatim,
    check = |value| EMAIL_RE.is_match(value),
);

validated_field!(
    Address, Address,
    "Addresses can take any value, and must not be blank or start with whitespace",
    normalize = verbatim,
    check = |value| ADDRESS_RE.is_match(value),
);

validated_field!(
    /// Listing category of a person; stored lowercase.
    Listing, Listing,
    "Listing should be one of: buyer, seller, landlord, tenant",
    normalize = lowercase,
    check = |value| LISTING_RE.is_match(value),
);

validated_field!(
    Tag, Tags,
    "Tag names should be alphanumeric",
    normalize = verbatim,
    check = |value| TAG_RE.is_match(value),
);

validated_field!(
    /// Asking price, kept in its textual form to avoid float rounding.
    Price, Price,
    "Prices should be a positive amount with at most 2 decimal places",
    normalize = verbatim,
    check = |value| {
        PRICE_RE.is_match(value) && value.chars().any(|c| c.is_ascii_digit() && c != '0')
    },
);

validated_field!(
    /// Display name of a property; identity of a property record.
    PropertyName, PropertyName,
    "Property names should start with a letter or digit and only contain letters, digits, \
     spaces and ' - #",
    normalize = nfc,
    check = |value| PROPERTY_NAME_RE.is_match(value),
);
