//! Identifier table: single uppercase letters bound to live payloads.

use indexmap::IndexMap;
use tas::types::Payload;

/// First valid identifier.
pub const FIRST: char = 'A';

/// Number of identifiers, `A` through `Y`.
pub const COUNT: usize = 25;

/// Why an identifier could not be bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindError {
    /// The identifier already holds a payload.
    Occupied,
}

/// Fixed set of identifiers, kept in alphabetical order.
#[derive(Debug)]
pub struct Identifiers {
    slots: IndexMap<char, Option<Payload>>,
}

impl Identifiers {
    pub fn new() -> Self {
        let slots = (0..COUNT as u8)
            .map(|i| (char::from(FIRST as u8 + i), None))
            .collect();
        Self { slots }
    }

    /// Whether `c` names an identifier.
    pub fn is_valid(&self, c: char) -> bool {
        self.slots.contains_key(&c)
    }

    pub fn get(&self, id: char) -> Option<Payload> {
        self.slots.get(&id).copied().flatten()
    }

    pub fn bind(&mut self, id: char, payload: Payload) -> Result<(), BindError> {
        match self.slots.get_mut(&id) {
            Some(slot @ None) => {
                *slot = Some(payload);
                Ok(())
            }
            _ => Err(BindError::Occupied),
        }
    }

    /// Forget the payload of `id`, returning it.
    pub fn take(&mut self, id: char) -> Option<Payload> {
        self.slots.get_mut(&id).and_then(Option::take)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, Option<Payload>)> + '_ {
        self.slots.iter().map(|(&id, &p)| (id, p))
    }
}

impl Default for Identifiers {
    fn default() -> Self {
        Self::new()
    }
}
