pub mod obj;
pub mod pgm;
