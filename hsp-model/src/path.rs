use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Location of an attribute in the model tree, written
/// `object_type.instance.attribute`.
///
/// The instance is everything between the first and the last dot, so
/// instance names may themselves contain dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributePath {
    pub object_type: String,
    pub instance: String,
    pub attribute: String,
}

impl AttributePath {
    pub fn new(object_type: &str, instance: &str, attribute: &str) -> Self {
        AttributePath {
            object_type: object_type.to_string(),
            instance: instance.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

impl FromStr for AttributePath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidPath(s.to_string());
        let (object_type, rest) = s.split_once('.').ok_or_else(invalid)?;
        let (instance, attribute) = rest.rsplit_once('.').ok_or_else(invalid)?;
        if object_type.is_empty() || instance.is_empty() || attribute.is_empty() {
            return Err(invalid());
        }
        Ok(AttributePath::new(object_type, instance, attribute))
    }
}

impl TryFrom<String> for AttributePath {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributePath> for String {
    fn from(path: AttributePath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.object_type, self.instance, self.attribute)
    }
}
