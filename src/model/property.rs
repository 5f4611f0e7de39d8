use super::fields::{Address, Price, PropertyName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub address: Address,
    pub price: Price,
    pub property_name: PropertyName,
}

impl Property {
    pub fn new(address: Address, price: Price, property_name: PropertyName) -> Self {
        Self {
            address,
            price,
            property_name,
        }
    }

    /// Two properties are the same listing when their names match.
    pub fn is_same_property(&self, other: &Property) -> bool {
        self.property_name == other.property_name
    }
}
