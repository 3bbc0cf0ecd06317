//! In-memory location service.
//!
//! Holds the URL query string of a headless session. Non-replacing updates push
//! the previous query onto a history stack.

use parking_lot::Mutex;
use stencil_application::ports::{LocationError, LocationService, UrlQueryMap, UrlQueryUpdate};
use stencil_domain::VariableValue;

#[derive(Debug, Default)]
struct LocationState {
    query: UrlQueryMap,
    history: Vec<UrlQueryMap>,
}

/// A [`LocationService`] kept in memory with a length limit.
#[derive(Debug)]
pub struct InMemoryLocation {
    state: Mutex<LocationState>,
    max_length: usize,
}

impl InMemoryLocation {
    /// Creates an empty location that rejects queries longer than `max_length`.
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self {
            state: Mutex::new(LocationState::default()),
            max_length,
        }
    }

    /// Creates a location from a query string such as `var-host=a&var-host=b`.
    ///
    /// A leading `?` is ignored; repeated keys collapse into a list value.
    #[must_use]
    pub fn from_query_string(query: &str, max_length: usize) -> Self {
        let location = Self::new(max_length);
        location.state.lock().query = parse_query(query);
        location
    }

    /// Serializes the current query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be URL-encoded.
    pub fn to_query_string(&self) -> Result<String, LocationError> {
        encode_query(&self.state.lock().query)
    }

    /// Queries replaced by non-replacing updates, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<UrlQueryMap> {
        self.state.lock().history.clone()
    }
}

impl LocationService for InMemoryLocation {
    fn get_search(&self) -> UrlQueryMap {
        self.state.lock().query.clone()
    }

    fn partial(&self, update: &UrlQueryUpdate, replace: bool) -> Result<(), LocationError> {
        let mut state = self.state.lock();
        let mut next = state.query.clone();
        for (key, value) in update {
            match value {
                Some(value) => {
                    next.insert(key.clone(), value.clone());
                }
                None => {
                    next.shift_remove(key);
                }
            }
        }

        let length = encode_query(&next)?.len();
        if length > self.max_length {
            return Err(LocationError::TooLong {
                length,
                limit: self.max_length,
            });
        }

        let previous = std::mem::replace(&mut state.query, next);
        if !replace {
            state.history.push(previous);
        }
        Ok(())
    }
}

fn parse_query(query: &str) -> UrlQueryMap {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut map = UrlQueryMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = value.into_owned();
        match map.get_mut(key.as_ref()) {
            Some(existing) => {
                let mut values = std::mem::take(existing).into_multi();
                if let VariableValue::Multi(list) = &mut values {
                    list.push(value);
                }
                *existing = values;
            }
            None => {
                map.insert(key.into_owned(), VariableValue::Single(value));
            }
        }
    }
    map
}

fn encode_query(query: &UrlQueryMap) -> Result<String, LocationError> {
    let pairs: Vec<(&str, &str)> = query
        .iter()
        .flat_map(|(key, value)| value.values().into_iter().map(move |v| (key.as_str(), v)))
        .collect();
    serde_urlencoded::to_string(pairs).map_err(|e| LocationError::Storage(e.to_string()))
}
