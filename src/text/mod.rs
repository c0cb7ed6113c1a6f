// Text normalization ahead of vectorization.

pub mod preprocess;
