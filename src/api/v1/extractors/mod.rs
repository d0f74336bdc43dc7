/**
 * Responsibility
 *  - Handler-facing extractors
 *  - Context: the admission chain's RequestContext / authenticated Principal
 *  - Body, path and query wrappers whose rejections use the AppError envelope
 */
mod context;
mod input;

pub use context::{Authenticated, Ctx};
pub use input::{ApiJson, ApiPath, ApiQuery};
