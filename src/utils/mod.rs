pub mod data;
pub mod normalize;
pub mod teams;
