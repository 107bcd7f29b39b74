use super::{Field, FieldValue};

/// Extra fields applied by the session's operation constructors.
///
/// Iteration follows insertion order so that construction, and therefore the
/// error reported for the first bad entry, is deterministic. Inserting a field
/// that is already present replaces the value and keeps its position.
///
/// ```rust
/// use smpp_session::datatypes::{Field, Params};
///
/// let params = Params::new()
///     .with(Field::RegisteredDelivery, 1u8)
///     .with(Field::DataCoding, 0x08u8);
///
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(Field, FieldValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, value: impl Into<FieldValue>) -> Option<FieldValue> {
        let value = value.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((field, value));
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.entries.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Into<FieldValue>> FromIterator<(Field, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (Field, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (field, value) in iter {
            params.insert(field, value);
        }
        params
    }
}
