//! Net assembly, execution and weight transfer.

mod blob;
mod filter;
mod forward;
mod lifetime;
mod model;
mod split;
mod weights;

pub use blob::{Blob, Shape};
pub use filter::{filter_net, state_meets_rule};
pub use lifetime::LifetimeTracker;
pub use model::{Net, ParamRef};
pub use split::{insert_splits, split_blob_name, split_layer_name};
