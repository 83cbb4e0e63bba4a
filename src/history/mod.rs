/// Revision range resolution over the commit graph.
pub mod range;

/// Deterministic ordering of a resolved range into sections.
pub mod sections;

pub(crate) use range::resolve;
pub(crate) use sections::{MessageAnnotator, Section, build};
