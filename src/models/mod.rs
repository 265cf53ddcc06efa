//! Data models for inspection submissions.
//!
//! Nothing here is persisted locally. A submission lives for one request and
//! the resulting `InspectionRecord` is owned by the SharePoint list.

pub mod inspection;
