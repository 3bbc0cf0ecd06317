//! Async request state with stale-response rejection.
//!
//! Every refresh is issued with a fresh [`RequestId`]. A completion is applied only
//! when it belongs to the most recent request for its entity, so late answers from
//! superseded requests are dropped regardless of the order they arrive in.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Issues strictly increasing request ids.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Returns the next id.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// An error reduced to plain data so it can live in state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedError {
    /// Human-readable message.
    pub message: String,

    /// Machine-readable code, if the source provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl SerializedError {
    /// Creates an error without a code.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Attaches a code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Serializes any error by its display text.
    #[must_use]
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        Self::new(error.to_string())
    }
}

impl fmt::Display for SerializedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for SerializedError {}

/// State of one asynchronous request slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncRequestState<T> {
    /// Last applied result.
    pub result: Option<T>,
    /// Whether a request is outstanding.
    pub loading: bool,
    /// Last applied error.
    pub error: Option<SerializedError>,
    /// Whether any request was ever issued.
    pub dispatched: bool,
    /// Id of the most recently issued request.
    pub request_id: Option<RequestId>,
}

impl<T> Default for AsyncRequestState<T> {
    fn default() -> Self {
        Self {
            result: None,
            loading: false,
            error: None,
            dispatched: false,
            request_id: None,
        }
    }
}

/// Lifecycle event of a request carrying argument `A` and payload `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncRequestAction<A, T> {
    /// The request was issued.
    Pending {
        /// Request id.
        request_id: RequestId,
        /// Request argument.
        arg: A,
    },
    /// The request succeeded.
    Fulfilled {
        /// Request id.
        request_id: RequestId,
        /// Request argument.
        arg: A,
        /// Result.
        payload: T,
    },
    /// The request failed.
    Rejected {
        /// Request id.
        request_id: RequestId,
        /// Request argument.
        arg: A,
        /// Failure.
        error: SerializedError,
    },
}

impl<A, T> AsyncRequestAction<A, T> {
    /// Returns the request argument.
    pub const fn arg(&self) -> &A {
        match self {
            Self::Pending { arg, .. } | Self::Fulfilled { arg, .. } | Self::Rejected { arg, .. } => {
                arg
            }
        }
    }

    /// Returns the request id.
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::Pending { request_id, .. }
            | Self::Fulfilled { request_id, .. }
            | Self::Rejected { request_id, .. } => *request_id,
        }
    }
}

impl<T> AsyncRequestState<T> {
    /// Applies an action; returns false when it was discarded as stale.
    ///
    /// Pending keeps the previous result and error. A fulfillment applies when no
    /// request id is recorded or the ids match; a rejection only on an exact match.
    pub fn reduce<A>(&mut self, action: AsyncRequestAction<A, T>) -> bool {
        match action {
            AsyncRequestAction::Pending { request_id, .. } => {
                self.loading = true;
                self.dispatched = true;
                self.request_id = Some(request_id);
                true
            }
            AsyncRequestAction::Fulfilled {
                request_id,
                payload,
                ..
            } => {
                if self.request_id.is_some_and(|current| current != request_id) {
                    return false;
                }
                self.result = Some(payload);
                self.loading = false;
                self.error = None;
                true
            }
            AsyncRequestAction::Rejected {
                request_id, error, ..
            } => {
                if self.request_id != Some(request_id) {
                    return false;
                }
                self.loading = false;
                self.error = Some(error);
                true
            }
        }
    }
}

/// Keyed collection of request slots.
///
/// The entity key is derived from the action argument, so concurrent requests for
/// different entities never touch each other's slot.
#[derive(Debug)]
pub struct AsyncRequestMap<A, K, T> {
    key_of: fn(&A) -> K,
    entries: HashMap<K, AsyncRequestState<T>>,
}

impl<A, K, T> AsyncRequestMap<A, K, T>
where
    K: Eq + Hash,
{
    /// Creates an empty map keyed by `key_of`.
    #[must_use]
    pub fn new(key_of: fn(&A) -> K) -> Self {
        Self {
            key_of,
            entries: HashMap::new(),
        }
    }

    /// Routes an action to its entity slot.
    pub fn reduce(&mut self, action: AsyncRequestAction<A, T>) -> bool {
        let key = (self.key_of)(action.arg());
        self.entries.entry(key).or_default().reduce(action)
    }

    /// Returns the slot of an entity.
    pub fn get(&self, key: &K) -> Option<&AsyncRequestState<T>> {
        self.entries.get(key)
    }

    /// Drops the slot of an entity.
    pub fn remove(&mut self, key: &K) -> Option<AsyncRequestState<T>> {
        self.entries.remove(key)
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns true if any entity has a request outstanding.
    pub fn any_loading(&self) -> bool {
        self.entries.values().any(|state| state.loading)
    }
}
