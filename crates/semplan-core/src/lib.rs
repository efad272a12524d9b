//! Course-plan reconciliation and mutation engine.
//!
//! ```text
//! PlanSession (mirror, notices, confirmations)
//!     |
//!     v
//! PlanSynchronizer --load--> RecordStore --> normalize --> CoursePlan
//!     |                                                       |
//!     |                                        mutate::add_course / ...
//!     |                                                       |
//!     +--commit(plan')--> RecordStore <-----------------------+
//! ```

pub mod catalog;
pub mod error;
pub mod plan;
pub mod session;
pub mod store;
pub mod sync;
pub mod view;

pub use catalog::{Catalog, Course, CourseDraft, CourseField, CourseFieldUpdate};
pub use error::PlanError;
pub use plan::{CourseId, CoursePlan, OwnerId, PlanId, Semester, SemesterId};
pub use session::{ActionOutcome, Notice, PlanSession, ResizeConfirmer, Severity};
pub use store::{
    AuthProvider, MemoryStore, PgStore, PlanRecord, RecordStore, SessionAuth, StoreError,
};
pub use sync::{ConflictPolicy, PlanSynchronizer};
pub use view::{BrowseView, PlanView};
