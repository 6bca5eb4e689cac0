pub mod common;
pub mod pool;

pub use common::{
    apply_guarded, AppendSumTransform, FilterMapTransform, JsonFieldsTransform, MapTransform,
    OutcomeTransform, PassthroughTransform, TryMapTransform,
};
pub use pool::{ResultStream, WorkerPool};
