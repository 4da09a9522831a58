pub mod core;
pub mod offset;
pub mod pagination;
pub mod records;
