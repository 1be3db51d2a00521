//! Personal email style guide generation

pub mod completion;
pub mod guide;

pub use guide::StyleGuideStore;
