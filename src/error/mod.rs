mod app;
mod archer;
mod store;
mod target;
mod validation;

pub use app::{AppError, AppResult};
pub use archer::ArcherError;
pub use store::StoreError;
pub use target::TargetError;
pub use validation::ValidationError;
