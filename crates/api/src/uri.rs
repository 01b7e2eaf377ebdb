//! Request target construction.
//!
//! A [`UriBuilder`] collects the path segments and query parameters of one
//! call and renders them into the path+query string handed to the
//! dispatcher. Builders are consumed by [`UriBuilder::render`], so a target
//! is never reused across requests.

use std::collections::BTreeMap;
use std::fmt;

/// REST roots exposed by the server.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceRoot {
    Users,
    Search,
    Repositories,
    Reviews,
}

impl ResourceRoot {
    pub fn base_path(&self) -> &'static str {
        match self {
            ResourceRoot::Users => "/rest-service/users-v1",
            ResourceRoot::Search => "/rest-service/search-v1",
            ResourceRoot::Repositories => "/rest-service/repositories-v1",
            ResourceRoot::Reviews => "/rest-service/reviews-v1",
        }
    }
}

impl fmt::Display for ResourceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_path())
    }
}

/// Values accepted by [`UriBuilder::set_query_param`].
///
/// Scalars produce one value, `None` and empty lists produce none (the
/// parameter is omitted), lists produce one value per element.
pub trait QueryValue {
    fn into_query_values(self) -> Vec<String>;
}

macro_rules! scalar_query_value {
    ($($ty:ty),*) => {
        $(
            impl QueryValue for $ty {
                fn into_query_values(self) -> Vec<String> {
                    vec![self.to_string()]
                }
            }
        )*
    };
}

scalar_query_value!(&str, String, &String, bool, u16, u32, u64, usize, i32, i64);

impl<T: QueryValue> QueryValue for Option<T> {
    fn into_query_values(self) -> Vec<String> {
        self.map(QueryValue::into_query_values).unwrap_or_default()
    }
}

impl<T: QueryValue> QueryValue for Vec<T> {
    fn into_query_values(self) -> Vec<String> {
        self.into_iter()
            .flat_map(QueryValue::into_query_values)
            .collect()
    }
}

impl<T: QueryValue + Clone> QueryValue for &[T] {
    fn into_query_values(self) -> Vec<String> {
        self.iter()
            .cloned()
            .flat_map(QueryValue::into_query_values)
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct UriBuilder {
    base: String,
    segments: Vec<String>,
    query: BTreeMap<String, Vec<String>>,
}

impl UriBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            segments: Vec::new(),
            query: BTreeMap::new(),
        }
    }

    pub fn for_root(root: ResourceRoot) -> Self {
        Self::new(root.base_path())
    }

    pub fn add_path_segment(mut self, segment: impl AsRef<str>) -> Self {
        self.segments.push(encode_segment(segment.as_ref()));
        self
    }

    pub fn add_path_segment_if(self, condition: bool, segment: impl AsRef<str>) -> Self {
        if condition {
            self.add_path_segment(segment)
        } else {
            self
        }
    }

    /// Replaces any previous values of `key`. A value that yields nothing
    /// removes the key from the query string.
    pub fn set_query_param(mut self, key: impl Into<String>, value: impl QueryValue) -> Self {
        let key = key.into();
        let values = value.into_query_values();
        if values.is_empty() {
            self.query.remove(&key);
        } else {
            self.query.insert(key, values);
        }
        self
    }

    pub fn render(self) -> String {
        let mut target = self.base;
        for segment in &self.segments {
            target.push('/');
            target.push_str(segment);
        }

        let pairs: Vec<String> = self
            .query
            .iter()
            .flat_map(|(key, values)| {
                let key = urlencoding::encode(key);
                values
                    .iter()
                    .map(move |value| format!("{}={}", key, urlencoding::encode(value)))
            })
            .collect();

        if !pairs.is_empty() {
            target.push('?');
            target.push_str(&pairs.join("&"));
        }

        target
    }
}

/// Encodes a segment like a URI path: `/` separators survive so that file
/// paths inside a repository keep their structure, everything else outside
/// the unreserved set is percent-encoded (including `%`).
fn encode_segment(segment: &str) -> String {
    segment
        .split('/')
        .map(|piece| urlencoding::encode(piece).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
