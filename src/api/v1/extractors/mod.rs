pub mod auth_ctx;
pub mod payload;
pub mod task_id;

pub use auth_ctx::{AuthCtx, AuthCtxExtractor};
pub use payload::{JsonBody, QueryParams};
pub use task_id::TaskId;
