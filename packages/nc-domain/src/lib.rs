pub mod decay;
pub mod gating;
pub mod similarity;
