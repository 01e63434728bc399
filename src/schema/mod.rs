mod field;

pub use field::BqType;
