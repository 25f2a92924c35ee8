pub mod img2tensor;
