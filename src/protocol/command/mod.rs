mod column_definition;
pub mod prepared;
pub mod utility;


pub use column_definition::ColumnDefinition;
pub use column_definition::ColumnDefinitionBytes;
pub use column_definition::ColumnDefinitionTail;
pub use column_definition::ColumnTypeAndFlags;
