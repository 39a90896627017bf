//! The slicing engine.
//!
//! - [`roles`]: which data axis is horizontal, vertical or fixed in a view.
//! - [`projector`]: turns a dataset plus roles into a displayable slice.
//! - [`region`]: rectangles and line cuts drawn on a view, and what they extract.
//! - [`pipeline`]: views chained through regions, kept consistent on every change.
//!
//! Stateful pieces report changes through [`observers::Observers`].

pub mod observers;
pub mod pipeline;
pub mod projector;
pub mod region;
pub mod roles;

pub use observers::{Observers, SubscriptionId};
pub use pipeline::{Pipeline, PipelineEvent, StageId};
pub use projector::{ProjectedSlice, SliceProjector};
pub use region::{
    extract_region, line_path, IndexPoint, Region, RegionEvent, RegionKind, RegionSelector,
    RegionUpdate, SelectorState, PATH_LABEL,
};
pub use roles::{AxisRole, AxisRoleAssignment, RoleEvent};
