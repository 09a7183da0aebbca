//! Call group spans.
//!
//! Every accepted call group gets a UUID v4 group ID; all events logged
//! while its attempts run carry it.

use tracing::Span;
use uuid::Uuid;

use crate::dispatch::request::RequestDescriptor;

pub fn call_group_span(group_id: Uuid, descriptor: &RequestDescriptor) -> Span {
    tracing::info_span!(
        "dispatch",
        group_id = %group_id,
        method = %descriptor.method(),
        url = %descriptor.url(),
    )
}
