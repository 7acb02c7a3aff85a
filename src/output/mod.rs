pub mod annotated;
pub mod table;

pub use annotated::AnnotatedWriter;
pub use table::save_csv;
