pub mod budget;
pub mod hash;
pub mod normalize;
pub mod similarity;
