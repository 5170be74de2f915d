//! The evaluation context threaded through the node tree.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Parameters extracted from the deep link that opened the screen
pub type UrlParameters = HashMap<String, String>;

/// Arbitrary values supplied by the host application
pub type UserInfo = Map<String, Value>;

/// The `{data, urlParameters, userInfo}` context used to resolve the
/// expressions of a subtree.
///
/// Entering a data source payload or a collection item replaces `data`;
/// the other two parts are shared unchanged by every narrowed scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataScope {
    /// Structured payload
    pub data: Value,
    /// Deep-link parameters
    pub url_parameters: Arc<UrlParameters>,
    /// Host-supplied values
    pub user_info: Arc<UserInfo>,
}

impl DataScope {
    /// Create a scope from its three parts
    pub fn new(data: Value, url_parameters: UrlParameters, user_info: UserInfo) -> Self {
        Self {
            data,
            url_parameters: Arc::new(url_parameters),
            user_info: Arc::new(user_info),
        }
    }

    /// A scope holding only a data payload
    pub fn from_data(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Narrow the scope to a new payload, keeping url parameters and user info
    pub fn with_data(&self, data: Value) -> Self {
        Self {
            data,
            url_parameters: Arc::clone(&self.url_parameters),
            user_info: Arc::clone(&self.user_info),
        }
    }

    /// Builder-style helper to add a url parameter
    pub fn with_url_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.url_parameters).insert(key.into(), value.into());
        self
    }

    /// Builder-style helper to add a user info entry
    pub fn with_user_info(mut self, key: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.user_info).insert(key.into(), value);
        self
    }
}
