pub mod excel_write;
pub mod summary;
