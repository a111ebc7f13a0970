//! Retrieval scope filters.
//!
//! Queries from a private channel may see that channel plus all public
//! channels; queries from a public channel see public channels only. Both
//! exclude the thread the question was asked in, since the model already
//! has that thread in its memory.

use serde::Serialize;

/// Channel type value carried by public channels.
pub const PUBLIC_CHANNEL_TYPE: &str = "channel";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Operator {
    Equal,
    NotEqual,
}

/// A backend-agnostic filter expression over document metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Cond {
        path: String,
        operator: Operator,
        value: String,
    },
}

impl Filter {
    pub fn equal(path: &str, value: &str) -> Self {
        Filter::Cond {
            path: path.into(),
            operator: Operator::Equal,
            value: value.into(),
        }
    }

    pub fn not_equal(path: &str, value: &str) -> Self {
        Filter::Cond {
            path: path.into(),
            operator: Operator::NotEqual,
            value: value.into(),
        }
    }
}

/// Scope for semantic search, excluding the current thread.
pub fn retrieval_filter(is_private: bool, channel_id: &str, thread_ts: &str) -> Filter {
    scoped(is_private, channel_id, Filter::not_equal("thread_ts", thread_ts))
}

/// Scope for exact permalink lookup.
pub fn permalink_filter(is_private: bool, channel_id: &str, permalink: &str) -> Filter {
    scoped(is_private, channel_id, Filter::equal("permalink", permalink))
}

fn scoped(is_private: bool, channel_id: &str, clause: Filter) -> Filter {
    if is_private {
        Filter::And(vec![
            clause,
            Filter::Or(vec![
                Filter::equal("channel_id", channel_id),
                Filter::equal("channel_type", PUBLIC_CHANNEL_TYPE),
            ]),
        ])
    } else {
        Filter::And(vec![
            Filter::equal("channel_type", PUBLIC_CHANNEL_TYPE),
            clause,
        ])
    }
}
