use thiserror::Error;

use super::fields::PropertyName;
use super::{Person, Property};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuplicateRecord {
    #[error("a person named {0} already exists")]
    Person(String),
    #[error("a property named {0} already exists")]
    Property(String),
}

/// In-memory snapshot of valid persons and properties, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBook {
    persons: Vec<Person>,
    properties: Vec<Property>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty() && self.properties.is_empty()
    }

    pub fn has_person(&self, person: &Person) -> bool {
        self.persons.iter().any(|p| p.is_same_person(person))
    }

    pub fn add_person(&mut self, person: Person) -> Result<(), DuplicateRecord> {
        if self.has_person(&person) {
            return Err(DuplicateRecord::Person(person.name.to_string()));
        }
        self.persons.push(person);
        Ok(())
    }

    /// Removes the person sharing `person`'s identity; returns it when found.
    pub fn remove_person(&mut self, person: &Person) -> Option<Person> {
        let pos = self.persons.iter().position(|p| p.is_same_person(person))?;
        Some(self.persons.remove(pos))
    }

    /// Case-insensitive whole-word match of any keyword against the name.
    pub fn find_persons<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<&Person> {
        self.persons
            .iter()
            .filter(|person| {
                let words: Vec<&str> = person.name.as_str().split_whitespace().collect();
                keywords.iter().any(|keyword| {
                    words
                        .iter()
                        .any(|word| word.to_lowercase() == keyword.as_ref().to_lowercase())
                })
            })
            .collect()
    }

    pub fn has_property(&self, property: &Property) -> bool {
        self.properties.iter().any(|p| p.is_same_property(property))
    }

    pub fn add_property(&mut self, property: Property) -> Result<(), DuplicateRecord> {
        if self.has_property(&property) {
            return Err(DuplicateRecord::Property(
                property.property_name.to_string(),
            ));
        }
        self.properties.push(property);
        Ok(())
    }

    pub fn property_named(&self, name: &PropertyName) -> Option<&Property> {
        self.properties.iter().find(|p| &p.property_name == name)
    }

    pub fn properties_owned_by<'a>(
        &'a self,
        person: &'a Person,
    ) -> impl Iterator<Item = &'a Property> {
        self.properties.iter().filter(move |p| person.owns(&p.property_name))
    }

    pub fn persons_interested_in<'a>(
        &'a self,
        property: &'a Property,
    ) -> impl Iterator<Item = &'a Person> {
        let name = &property.property_name;
        self.persons.iter().filter(move |p| p.is_interested_in(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Address, Email, Name, Phone, Price};

    fn person(name: &str) -> Person {
        Person::new(
            Name::parse(name).unwrap(),
            Phone::parse("91234567").unwrap(),
            Email::parse("a@b.com").unwrap(),
            Address::parse("x").unwrap(),
        )
    }

    fn property(name: &str) -> Property {
        Property::new(
            Address::parse("1 Main St").unwrap(),
            Price::parse("500000").unwrap(),
            PropertyName::parse(name).unwrap(),
        )
    }

    #[test]
    fn rejects_duplicate_people() {
        let mut book = AddressBook::new();
        book.add_person(person("Alice")).unwrap();
        let err = book.add_person(person("Alice")).unwrap_err();
        assert_eq!(err, DuplicateRecord::Person("Alice".into()));
        assert_eq!(book.persons().len(), 1);
    }

    #[test]
    fn find_matches_whole_words_ignoring_case() {
        let mut book = AddressBook::new();
        book.add_person(person("Alice Yeoh")).unwrap();
        book.add_person(person("Bob Ali")).unwrap();

        let found = book.find_persons(&["ali"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_str(), "Bob Ali");
        assert_eq!(book.find_persons(&["yeoh", "bob"]).len(), 2);
    }

    #[test]
    fn remove_person_by_identity() {
        let mut book = AddressBook::new();
        book.add_person(person("Alice")).unwrap();
        assert!(book.remove_person(&person("Alice")).is_some());
        assert!(book.remove_person(&person("Alice")).is_none());
    }

    #[test]
    fn cross_links_resolve_by_property_name() {
        let mut book = AddressBook::new();
        let villa = property("Sunrise Villa");
        book.add_property(villa.clone()).unwrap();
        book.add_property(property("Harbour Loft")).unwrap();
        let owner = person("Alice").with_owned([villa.property_name.clone()]);
        let buyer = person("Bob").with_interested([villa.property_name.clone()]);
        book.add_person(owner.clone()).unwrap();
        book.add_person(buyer).unwrap();

        let owned: Vec<_> = book.properties_owned_by(&owner).collect();
        assert_eq!(owned, vec![&villa]);
        let interested: Vec<_> = book
            .persons_interested_in(&villa)
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(interested, vec!["Bob"]);
        assert!(book.add_property(property("Sunrise Villa")).is_err());
    }
}
