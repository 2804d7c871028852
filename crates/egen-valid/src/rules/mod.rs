pub mod classes;
pub mod func_shape;
pub mod identifiers;
pub mod per_op;
