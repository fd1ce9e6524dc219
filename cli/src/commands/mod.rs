pub mod inspect;
pub mod preprocess;
pub mod score;
