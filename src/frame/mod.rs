mod dataframe;
mod json;
mod value;

pub use dataframe::{Column, ColumnInfo, Dataframe, FrameInfo, Row};
pub use value::Value;
