pub mod address_book;
pub mod fields;
pub mod person;
pub mod property;

pub use address_book::{AddressBook, DuplicateRecord};
pub use fields::{
    Address, Email, FieldError, FieldKey, Listing, Name, Phone, Price, PropertyName, Tag,
    PERSON_FIELD_ORDER, PROPERTY_FIELD_ORDER,
};
pub use person::Person;
pub use property::Property;
