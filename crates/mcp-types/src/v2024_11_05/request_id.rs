use std::{
    fmt,
    hash::{Hash, Hasher},
};

use crate::RequestId;

impl Hash for RequestId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl Eq for RequestId {}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(id) => f.write_str(id),
            RequestId::Integer(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_request_id_display() {
        assert_eq!(RequestId::Integer(42).to_string(), "42");
        assert_eq!(RequestId::String("abc".into()).to_string(), "abc");
    }

    #[test]
    fn test_request_id_as_map_key() {
        let mut ids = HashSet::new();
        assert!(ids.insert(RequestId::Integer(1)));
        assert!(ids.insert(RequestId::Integer(2)));
        assert!(!ids.insert(RequestId::Integer(1)));
    }
}
